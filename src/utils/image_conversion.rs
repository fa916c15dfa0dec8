//! Conversion of OpenCV images into model input tensors.

use crate::{Error, Result};
use ndarray::Array4;
use opencv::{
    core::{Mat, Size, Vec3f, CV_32F},
    imgproc::{self, InterpolationFlags},
    prelude::*,
};

/// Memory layout expected by a model input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[batch, channels, height, width]`
    Nchw,
    /// `[batch, height, width, channels]`
    Nhwc,
}

impl TensorLayout {
    /// Infer the layout from ONNX input dimensions
    ///
    /// A 4D input whose second dimension is 3 is treated as channels-first;
    /// anything else is channels-last.
    #[must_use]
    pub fn from_dimensions(dims: &[Option<u32>]) -> Self {
        match dims {
            [_, Some(3), _, _] => Self::Nchw,
            _ => Self::Nhwc,
        }
    }
}

/// Resize a BGR image and convert it to a normalized RGB tensor
///
/// Each channel value `v` in `[0, 255]` becomes `(v - offset) / scale`.
///
/// # Errors
///
/// Returns an error if the image is empty, not 3-channel, or an `OpenCV`
/// operation fails
#[allow(clippy::cast_sign_loss)] // Dimensions are validated positive
pub fn bgr_to_tensor(
    image: &Mat,
    width: i32,
    height: i32,
    offset: f32,
    scale: f32,
    layout: TensorLayout,
) -> Result<Array4<f32>> {
    if image.empty() || image.channels() != 3 {
        return Err(Error::InvalidInput(format!(
            "Expected non-empty 3-channel image, got {}x{}x{}",
            image.cols(),
            image.rows(),
            image.channels()
        )));
    }
    if width <= 0 || height <= 0 || scale == 0.0 {
        return Err(Error::InvalidInput(format!(
            "Invalid tensor geometry {width}x{height} (scale {scale})"
        )));
    }

    let mut resized = Mat::default();
    if image.cols() == width && image.rows() == height {
        image.copy_to(&mut resized)?;
    } else {
        imgproc::resize(
            image,
            &mut resized,
            Size::new(width, height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;
    }

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

    let mut float_image = Mat::default();
    rgb.convert_to(&mut float_image, CV_32F, 1.0, 0.0)?;

    let (h, w) = (height as usize, width as usize);
    let mut tensor = match layout {
        TensorLayout::Nchw => Array4::<f32>::zeros((1, 3, h, w)),
        TensorLayout::Nhwc => Array4::<f32>::zeros((1, h, w, 3)),
    };

    for row in 0..height {
        for col in 0..width {
            let pixel = float_image.at_2d::<Vec3f>(row, col)?;
            let (r, c) = (row as usize, col as usize);
            for ch in 0..3 {
                let value = (pixel[ch] - offset) / scale;
                match layout {
                    TensorLayout::Nchw => tensor[[0, ch, r, c]] = value,
                    TensorLayout::Nhwc => tensor[[0, r, c, ch]] = value,
                }
            }
        }
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, CV_8UC1, CV_8UC3};

    #[test]
    fn test_layout_from_dimensions() {
        assert_eq!(
            TensorLayout::from_dimensions(&[Some(1), Some(3), Some(640), Some(640)]),
            TensorLayout::Nchw
        );
        assert_eq!(
            TensorLayout::from_dimensions(&[Some(1), Some(256), Some(256), Some(3)]),
            TensorLayout::Nhwc
        );
        assert_eq!(TensorLayout::from_dimensions(&[None, None]), TensorLayout::Nhwc);
    }

    #[test]
    fn test_bgr_to_tensor_swaps_channels_and_normalizes() {
        // BGR (10, 20, 30)
        let image = Mat::new_rows_cols_with_default(4, 6, CV_8UC3, Scalar::new(10.0, 20.0, 30.0, 0.0)).unwrap();

        let nchw = bgr_to_tensor(&image, 6, 4, 0.0, 1.0, TensorLayout::Nchw).unwrap();
        assert_eq!(nchw.shape(), &[1, 3, 4, 6]);
        assert_eq!(nchw[[0, 0, 0, 0]], 30.0);
        assert_eq!(nchw[[0, 2, 3, 5]], 10.0);

        let nhwc = bgr_to_tensor(&image, 2, 2, 10.0, 10.0, TensorLayout::Nhwc).unwrap();
        assert_eq!(nhwc.shape(), &[1, 2, 2, 3]);
        assert_eq!(nhwc[[0, 1, 1, 0]], 2.0);
        assert_eq!(nhwc[[0, 1, 1, 2]], 0.0);
    }

    #[test]
    fn test_bgr_to_tensor_rejects_grayscale() {
        let gray = Mat::new_rows_cols_with_default(4, 4, CV_8UC1, Scalar::all(0.0)).unwrap();
        assert!(bgr_to_tensor(&gray, 4, 4, 0.0, 1.0, TensorLayout::Nchw).is_err());
    }
}

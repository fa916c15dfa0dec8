//! Tests for the per-tick attention loop with scripted detectors and sources


use gaze_attention::{
    attention::Roi,
    landmarks::FaceLandmarks,
    tracker::{AttentionTracker, PlaybackMode},
    Error,
};
use opencv::{core::Point, prelude::*};
use std::{cell::Cell, rc::Rc};
use test_helpers::{landmarks_from_pixels, FrameSequence, ScriptedDetector};

const WIDTH: i32 = 640;
const HEIGHT: i32 = 512;
const SECONDS_PER_FRAME: f64 = 0.03;

type TestTracker = AttentionTracker<ScriptedDetector, FrameSequence, FrameSequence>;

/// Face whose gaze point is (330, 266)
fn attentive_face() -> FaceLandmarks {
    landmarks_from_pixels(WIDTH, HEIGHT, &[(200, 150)], (190, 140))
}

/// Face whose gaze point is (520, 256)
fn distracted_face() -> FaceLandmarks {
    landmarks_from_pixels(WIDTH, HEIGHT, &[(400, 200)], (200, 200))
}

fn tracker_with(detector: ScriptedDetector) -> TestTracker {
    let camera = FrameSequence::camera(WIDTH, HEIGHT).unwrap();
    AttentionTracker::new(detector, camera, Roi::new(100, 50, 380, 310), SECONDS_PER_FRAME)
}

#[test]
fn test_counters_follow_roi_hits() {
    let detector = ScriptedDetector::new(vec![
        Ok(vec![attentive_face()]),
        Ok(Vec::new()),
        Ok(vec![distracted_face()]),
        Ok(vec![attentive_face()]),
    ]);
    let mut tracker = tracker_with(detector);

    let first = tracker.tick().unwrap();
    assert_eq!(first.gaze_point, Some(Point::new(330, 266)));
    assert_eq!(first.attentive, Some(true));

    let second = tracker.tick().unwrap();
    assert!(second.gaze.is_none());
    assert!(second.attentive.is_none());
    assert!(second.camera_frame.is_some());

    let third = tracker.tick().unwrap();
    assert_eq!(third.gaze_point, Some(Point::new(520, 256)));
    assert_eq!(third.attentive, Some(false));

    tracker.tick().unwrap();

    let counters = tracker.counters();
    assert_eq!(counters.total_frames(), 3);
    assert_eq!(counters.attentive_frames(), 2);
    assert!(counters.attentive_frames() <= counters.total_frames());
}

#[test]
fn test_summary_absent_until_first_face() {
    let detector = ScriptedDetector::new(vec![Ok(Vec::new()), Ok(vec![attentive_face()])]);
    let mut tracker = tracker_with(detector);

    let output = tracker.tick().unwrap();
    assert!(output.summary.is_none());

    let output = tracker.tick().unwrap();
    let summary = output.summary.expect("one frame was scored");
    assert_eq!(summary.total_frames, 1);
    assert_eq!(summary.attentive_frames, 1);
    assert_eq!(
        summary.to_string(),
        "Frames: 1, Attention inside ROI: 1 (100.0%)\nTotal time: 0.0s, Attentive: 0.0s"
    );
}

#[test]
fn test_camera_failure_is_skipped() {
    let detector = ScriptedDetector::always(attentive_face(), 5);
    let mut tracker: TestTracker =
        AttentionTracker::new(detector, FrameSequence::failing(), Roi::default(), SECONDS_PER_FRAME);

    let output = tracker.tick().unwrap();
    assert!(output.camera_frame.is_none());
    assert!(output.gaze.is_none());
    assert_eq!(tracker.counters().total_frames(), 0);
}

#[test]
fn test_detector_failure_is_skipped() {
    let detector = ScriptedDetector::new(vec![
        Err(Error::ModelOutputError("inference failed".to_string())),
        Ok(vec![attentive_face()]),
    ]);
    let mut tracker = tracker_with(detector);

    let output = tracker.tick().unwrap();
    assert!(output.gaze.is_none());
    assert_eq!(tracker.counters().total_frames(), 0);

    tracker.tick().unwrap();
    assert_eq!(tracker.counters().total_frames(), 1);
}

#[test]
fn test_video_loops_with_single_rewind() {
    let detector = ScriptedDetector::new(Vec::new());
    let mut tracker = tracker_with(detector);
    let video = FrameSequence::numbered(10).unwrap();
    let rewinds = video.rewinds.clone();
    tracker.replace_video("numbered", || Ok(video)).unwrap();
    assert_eq!(tracker.mode(), PlaybackMode::CameraAndVideo);

    let mut seen = Vec::new();
    for _ in 0..11 {
        let output = tracker.tick().unwrap();
        let frame = output.video_frame.expect("video frame every tick");
        seen.push(*frame.at_2d::<u8>(0, 0).unwrap());
    }

    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 1]);
    assert_eq!(rewinds.get(), 1);

    let playback = tracker.video().unwrap();
    assert_eq!(playback.rewinds(), 1);
    assert_eq!(playback.frames_delivered(), 11);
}

#[test]
fn test_replace_video_releases_before_opening() {
    let mut tracker = tracker_with(ScriptedDetector::new(Vec::new()));

    let first = FrameSequence::numbered(3).unwrap();
    let first_releases = first.releases.clone();
    tracker.replace_video("first", || Ok(first)).unwrap();

    let second = FrameSequence::numbered(3).unwrap();
    let second_releases = second.releases.clone();
    let released_at_open = Rc::new(Cell::new(None));
    let seen = Rc::clone(&released_at_open);
    let first_at_open = Rc::clone(&first_releases);
    tracker
        .replace_video("second", move || {
            seen.set(Some(first_at_open.get()));
            Ok(second)
        })
        .unwrap();

    assert_eq!(released_at_open.get(), Some(1));
    assert_eq!(first_releases.get(), 1);
    assert_eq!(second_releases.get(), 0);
    assert_eq!(tracker.video().unwrap().name(), "second");

    tracker.release_video();
    assert_eq!(second_releases.get(), 1);
    assert_eq!(tracker.mode(), PlaybackMode::CameraOnly);

    // Releasing again is a no-op
    tracker.release_video();
    assert_eq!(second_releases.get(), 1);
}

#[test]
fn test_failed_open_leaves_camera_only() {
    let mut tracker = tracker_with(ScriptedDetector::always(attentive_face(), 1));

    let first = FrameSequence::numbered(3).unwrap();
    let first_releases = first.releases.clone();
    tracker.replace_video("first", || Ok(first)).unwrap();

    let result = tracker.replace_video("missing.mp4", || Err(Error::VideoOpen("missing.mp4".to_string())));
    assert!(matches!(result, Err(Error::VideoOpen(_))));
    assert_eq!(first_releases.get(), 1);
    assert_eq!(tracker.mode(), PlaybackMode::CameraOnly);
    assert!(tracker.video().is_none());

    // The loop keeps running on the camera alone
    let output = tracker.tick().unwrap();
    assert!(output.video_frame.is_none());
    assert_eq!(output.attentive, Some(true));
}

#[test]
fn test_camera_failure_still_plays_video() {
    let detector = ScriptedDetector::always(attentive_face(), 2);
    let mut tracker: TestTracker =
        AttentionTracker::new(detector, FrameSequence::failing(), Roi::default(), SECONDS_PER_FRAME);
    tracker
        .replace_video("numbered", || FrameSequence::numbered(3))
        .unwrap();

    let output = tracker.tick().unwrap();
    assert!(output.camera_frame.is_none());
    let frame = output.video_frame.expect("video plays without the camera");
    assert_eq!(*frame.at_2d::<u8>(0, 0).unwrap(), 1);
    assert_eq!(tracker.counters().total_frames(), 0);
}

#[test]
fn test_video_read_error_is_skipped() {
    let mut tracker = tracker_with(ScriptedDetector::always(attentive_face(), 2));
    let broken = FrameSequence::failing();
    let releases = broken.releases.clone();
    tracker.replace_video("broken", || Ok(broken)).unwrap();

    for _ in 0..2 {
        let output = tracker.tick().unwrap();
        assert!(output.video_frame.is_none());
        assert!(output.camera_frame.is_some());
    }

    assert_eq!(releases.get(), 0);
    assert_eq!(tracker.mode(), PlaybackMode::CameraAndVideo);
    assert_eq!(tracker.counters().total_frames(), 2);
}

#[test]
fn test_empty_video_falls_back_to_camera_only() {
    let detector = ScriptedDetector::always(attentive_face(), 2);
    let mut tracker = tracker_with(detector);
    let empty = FrameSequence::new(Vec::new());
    let releases = empty.releases.clone();
    let rewinds = empty.rewinds.clone();
    tracker.replace_video("empty.mp4", || Ok(empty)).unwrap();

    let output = tracker.tick().unwrap();
    assert!(output.video_frame.is_none());
    assert!(output.camera_frame.is_some());
    assert_eq!(rewinds.get(), 1);
    assert_eq!(releases.get(), 1);
    assert_eq!(tracker.mode(), PlaybackMode::CameraOnly);

    // Camera keeps scoring after the fallback
    tracker.tick().unwrap();
    assert_eq!(tracker.counters().total_frames(), 2);
}

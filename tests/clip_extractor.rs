//! Clip extraction with the native backend on generated WAV recordings.

mod common;

use std::path::Path;

use chrono::TimeDelta;
use common::{RATE, at, read_samples, second_marker, write_wav};
use sanctclip::clipper::{ClipExtractor, ClipStatus, LocalRecording, NativeCutter, local_recording};
use sanctclip::coverage::{AudioSpan, Cover, TimeWindow, WindowCover, match_windows};
use sanctclip::media::ProbedStream;
use sanctclip::utils::TimeInstant;
use tempfile::TempDir;

fn span(name: &str, start: TimeInstant) -> AudioSpan {
    AudioSpan {
        url: format!("gs://bucket/{name}"),
        basename: name.to_string(),
        deployment: "sanctsound_ci01_01".to_string(),
        start,
        end: start,
    }
}

fn recording(dir: &Path, name: &str, start: TimeInstant, secs: u32) -> LocalRecording {
    let path = dir.join(name);
    write_wav(&path, secs);
    local_recording(&path, span(name, start), |_| None, 3600.0).unwrap()
}

fn window(start: TimeInstant, secs: i64) -> TimeWindow {
    TimeWindow::new(start, start + TimeDelta::seconds(secs)).unwrap()
}

fn small_extractor() -> ClipExtractor {
    ClipExtractor::new(Box::new(NativeCutter), 1000)
}

#[test]
fn test_local_recording_uses_probed_length() {
    let dir = TempDir::new().unwrap();
    let rec = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    assert_eq!(rec.span.end, at(0, 1));
    assert_eq!(rec.info.unwrap().sample_rate, RATE);
    assert!((rec.length_secs() - 60.0).abs() < 1e-9);
}

#[test]
fn test_local_recording_falls_back_when_unreadable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a_20210101T000000Z.flac");
    std::fs::write(&path, b"not audio").unwrap();

    let stream = |rate, channels| ProbedStream {
        duration_secs: 90.0,
        sample_rate: rate,
        channels,
    };

    let rec = local_recording(&path, span("a", at(0, 0)), |_| Some(stream(None, None)), 3600.0)
        .unwrap();
    assert!(rec.info.is_none());
    assert_eq!(rec.span.end, at(0, 1) + TimeDelta::seconds(30));

    let rec = local_recording(
        &path,
        span("a", at(0, 0)),
        |_| Some(stream(Some(48_000), Some(1))),
        3600.0,
    )
    .unwrap();
    let info = rec.info.unwrap();
    assert_eq!((info.sample_rate, info.channels, info.frames), (48_000, 1, 4_320_000));

    let rec = local_recording(&path, span("a", at(0, 0)), |_| None, 3600.0).unwrap();
    assert_eq!(rec.span.end, at(1, 0));
}

#[test]
fn test_single_recording_cut_is_sample_exact() {
    let dir = TempDir::new().unwrap();
    let rec = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let win = window(at(0, 0) + TimeDelta::seconds(10), 10);
    let report = match_windows(&[rec.clone()], &[win]);
    assert_eq!(report.covers[0].cover, Cover::Single(0));

    let out = small_extractor().extract(&report.covers[0], &[rec], dir.path());
    assert_eq!(out.status, ClipStatus::Written);
    assert_eq!(out.source_names, vec!["a_20210101T000000Z.wav"]);
    assert!((out.duration_secs - 10.0).abs() < 1e-9);

    let clip = out.clip_path.unwrap();
    assert_eq!(
        clip.file_name().unwrap().to_str().unwrap(),
        "a_20210101T000000Z__20210101T000010_20210101T000020.wav"
    );
    let samples = read_samples(&clip);
    assert_eq!(samples.len(), 10 * RATE as usize);
    assert_eq!(samples[0], second_marker(10));
    assert_eq!(*samples.last().unwrap(), second_marker(19));
}

#[test]
fn test_window_across_two_recordings_is_spliced() {
    let dir = TempDir::new().unwrap();
    let a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let b = recording(dir.path(), "b_20210101T000100Z.wav", at(0, 1), 60);
    let recordings = vec![a, b];

    // 00:00:30 .. 00:01:15
    let win = window(at(0, 0) + TimeDelta::seconds(30), 45);
    let report = match_windows(&recordings, &[win]);
    assert_eq!(report.covers[0].cover, Cover::Spliced(0, 1));

    let out = small_extractor().extract(&report.covers[0], &recordings, dir.path());
    assert_eq!(out.status, ClipStatus::Written);
    assert_eq!(
        out.source_names,
        vec!["a_20210101T000000Z.wav", "b_20210101T000100Z.wav"]
    );
    assert!((out.duration_secs - 45.0).abs() < 1e-9);

    let samples = read_samples(out.clip_path.as_deref().unwrap());
    let rate = RATE as usize;
    assert_eq!(samples.len(), 45 * rate);
    assert_eq!(samples[0], second_marker(30));
    assert_eq!(samples[30 * rate - 1], second_marker(59));
    assert_eq!(samples[30 * rate], second_marker(0));
    assert_eq!(*samples.last().unwrap(), second_marker(14));
}

#[test]
fn test_unmatched_window_is_missing_source() {
    let dir = TempDir::new().unwrap();
    let a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let win = window(at(0, 5), 30);
    let report = match_windows(&[a.clone()], &[win]);
    assert_eq!(report.covers[0].cover, Cover::Unmatched);

    let out = small_extractor().extract(&report.covers[0], &[a], dir.path());
    assert_eq!(out.status, ClipStatus::MissingSource);
    assert!(out.clip_path.is_none());
    assert!((out.duration_secs - 30.0).abs() < 1e-9);
}

#[test]
fn test_secondary_short_of_window_end_is_missing_source() {
    let dir = TempDir::new().unwrap();
    let a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let b = recording(dir.path(), "b_20210101T000100Z.wav", at(0, 1), 5);
    let cover = WindowCover {
        window: window(at(0, 0) + TimeDelta::seconds(30), 45),
        cover: Cover::Spliced(0, 1),
    };

    let out = small_extractor().extract(&cover, &[a, b], dir.path());
    assert_eq!(out.status, ClipStatus::MissingSource);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_start_beyond_file_is_out_of_bounds() {
    let dir = TempDir::new().unwrap();
    let mut a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    // Listing claimed two hours; the file holds one minute.
    a.span.end = at(2, 0);
    let cover = WindowCover {
        window: window(at(0, 30), 60),
        cover: Cover::Single(0),
    };

    let out = small_extractor().extract(&cover, &[a], dir.path());
    assert_eq!(out.status, ClipStatus::StartOutOfBounds);
}

#[test]
fn test_tiny_clip_is_discarded() {
    let dir = TempDir::new().unwrap();
    let a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let win = window(at(0, 0), 10);
    let report = match_windows(&[a.clone()], &[win]);

    // 10 s at 100 Hz is 2000 data bytes, below the default floor
    let extractor = ClipExtractor::new(Box::new(NativeCutter), 10_000);
    let out = extractor.extract(&report.covers[0], &[a], dir.path());
    assert_eq!(out.status, ClipStatus::TooSmall);
    assert!(out.clip_path.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_clip_exactly_at_size_floor_is_kept() {
    let dir = TempDir::new().unwrap();
    let a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let report = match_windows(&[a.clone()], &[window(at(0, 0), 10)]);
    let cover = &report.covers[0];

    let out = ClipExtractor::new(Box::new(NativeCutter), 0).extract(cover, &[a.clone()], dir.path());
    let size = std::fs::metadata(out.clip_path.unwrap()).unwrap().len();

    let at_floor = ClipExtractor::new(Box::new(NativeCutter), size);
    assert_eq!(at_floor.extract(cover, &[a.clone()], dir.path()).status, ClipStatus::Written);

    let above_floor = ClipExtractor::new(Box::new(NativeCutter), size + 1);
    assert_eq!(above_floor.extract(cover, &[a], dir.path()).status, ClipStatus::TooSmall);
}

#[test]
fn test_splice_across_sample_rates_is_format_mismatch() {
    let dir = TempDir::new().unwrap();
    let a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);

    let b_path = dir.path().join("b_20210101T000100Z.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE * 2,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&b_path, spec).unwrap();
    for _ in 0..RATE * 2 * 60 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
    let b = local_recording(&b_path, span("b_20210101T000100Z.wav", at(0, 1)), |_| None, 3600.0)
        .unwrap();

    let win = window(at(0, 0) + TimeDelta::seconds(30), 45);
    let report = match_windows(&[a.clone(), b.clone()], &[win]);
    let out = small_extractor().extract(&report.covers[0], &[a, b], dir.path());
    assert_eq!(out.status, ClipStatus::FormatMismatch);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_missing_local_file_is_cut_failure() {
    let dir = TempDir::new().unwrap();
    let a = recording(dir.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    std::fs::remove_file(&a.path).unwrap();

    let win = window(at(0, 0), 30);
    let report = match_windows(&[a.clone()], &[win]);
    let out = small_extractor().extract(&report.covers[0], &[a], dir.path());
    assert_eq!(out.status, ClipStatus::CutFailed);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

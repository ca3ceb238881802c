//! The ffmpeg backend driven through a stand-in `ffmpeg` script.

#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use common::{at, write_wav};
use sanctclip::clipper::{ClipExtractor, ClipStatus, FfmpegCutter, LocalRecording, local_recording};
use sanctclip::coverage::{AudioSpan, Cover, TimeWindow, WindowCover};
use sanctclip::media::Ffmpeg;
use sanctclip::utils::TimeInstant;
use tempfile::TempDir;

/// Writes an `ffmpeg` that logs its arguments and copies a 45 s WAV to its
/// last argument.
fn fake_ffmpeg(dir: &Path) -> (PathBuf, PathBuf) {
    let fixture = dir.join("fixture.wav");
    write_wav(&fixture, 45);
    let log = dir.join("ffmpeg.log");
    let script = dir.join("ffmpeg");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\necho \"$*\" >> '{}'\nfor last; do :; done\ncp '{}' \"$last\"\n",
            log.display(),
            fixture.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    (script, log)
}

fn extractor(script: &Path) -> ClipExtractor {
    let ffmpeg = Ffmpeg::new(script.display().to_string(), Duration::from_secs(10));
    ClipExtractor::new(Box::new(FfmpegCutter::new(ffmpeg)), 1000)
}

fn recording(dir: &Path, name: &str, start: TimeInstant, secs: u32) -> LocalRecording {
    let path = dir.join(name);
    write_wav(&path, secs);
    let span = AudioSpan {
        url: name.to_string(),
        basename: name.to_string(),
        deployment: "sanctsound_ci01_01".to_string(),
        start,
        end: start,
    };
    local_recording(&path, span, |_| None, 3600.0).unwrap()
}

fn spliced_cover() -> WindowCover {
    let start = at(0, 0) + TimeDelta::seconds(30);
    WindowCover {
        window: TimeWindow::new(start, start + TimeDelta::seconds(45)).unwrap(),
        cover: Cover::Spliced(0, 1),
    }
}

#[test]
fn test_ffmpeg_single_cut_arguments() {
    let tools = TempDir::new().unwrap();
    let clips = TempDir::new().unwrap();
    let (script, log) = fake_ffmpeg(tools.path());
    let a = recording(tools.path(), "a_20210101T000000Z.wav", at(0, 0), 60);

    let start = at(0, 0) + TimeDelta::seconds(10);
    let cover = WindowCover {
        window: TimeWindow::new(start, start + TimeDelta::seconds(20)).unwrap(),
        cover: Cover::Single(0),
    };
    let out = extractor(&script).extract(&cover, &[a], clips.path());
    assert_eq!(out.status, ClipStatus::Written);

    let calls = fs::read_to_string(&log).unwrap();
    assert_eq!(calls.lines().count(), 1);
    assert!(calls.contains("-ss 10.000 -i "));
    assert!(calls.contains("-t 20.000 -c:a pcm_s16le"));
}

#[test]
fn test_ffmpeg_splice_cuts_tail_and_head_then_concats() {
    let tools = TempDir::new().unwrap();
    let clips = TempDir::new().unwrap();
    let (script, log) = fake_ffmpeg(tools.path());
    let a = recording(tools.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let b = recording(tools.path(), "b_20210101T000100Z.wav", at(0, 1), 60);

    let out = extractor(&script).extract(&spliced_cover(), &[a, b], clips.path());
    assert_eq!(out.status, ClipStatus::Written);
    assert_eq!(
        out.source_names,
        vec!["a_20210101T000000Z.wav", "b_20210101T000100Z.wav"]
    );
    assert!((out.duration_secs - 45.0).abs() < 1e-9);

    let calls = fs::read_to_string(&log).unwrap();
    let calls: Vec<&str> = calls.lines().collect();
    assert_eq!(calls.len(), 3);
    // Tail of the first recording runs to its end.
    assert!(calls[0].contains("-ss 30.000 -i "));
    assert!(calls[0].contains("a_20210101T000000Z.wav"));
    assert!(!calls[0].contains(" -t "));
    // Head of the second makes up the remaining 15 s.
    assert!(calls[1].contains("-ss 0.000 -i "));
    assert!(calls[1].contains("b_20210101T000100Z.wav -t 15.000"));
    assert!(calls[2].contains("-f concat -safe 0"));

    // Only the clip is left behind.
    let names: Vec<String> = fs::read_dir(clips.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["a_20210101T000000Z__20210101T000030_20210101T000115.wav"]
    );
}

#[test]
fn test_ffmpeg_splice_with_unknown_format_is_refused() {
    let tools = TempDir::new().unwrap();
    let clips = TempDir::new().unwrap();
    let (script, log) = fake_ffmpeg(tools.path());
    let a = recording(tools.path(), "a_20210101T000000Z.wav", at(0, 0), 60);
    let mut b = recording(tools.path(), "b_20210101T000100Z.wav", at(0, 1), 60);
    b.info = None;

    let out = extractor(&script).extract(&spliced_cover(), &[a, b], clips.path());
    assert_eq!(out.status, ClipStatus::FormatMismatch);
    assert!(out.clip_path.is_none());
    assert!(!log.exists());
    assert_eq!(fs::read_dir(clips.path()).unwrap().count(), 0);
}

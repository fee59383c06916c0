use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{VisError, VisResult};
use crate::render::pipeline::FrameStore;

/// Encoder settings handed through to ffmpeg.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncodeOptions {
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_crf() -> u32 { 18 }
fn default_audio_codec() -> String { "aac".into() }
fn default_audio_bitrate() -> String { "192k".into() }

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Argument list for muxing a frame store with its audio track.
///
/// `audio_offset` seeks the audio input so it lines up with a trimmed
/// selection; the output stops at the shorter of the two streams.
pub fn build_args(
    store: &FrameStore,
    audio: &Path,
    audio_offset: f64,
    output: &Path,
    opts: &EncodeOptions,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-framerate".into(),
        store.fps().to_string().into(),
        "-i".into(),
        store.pattern().into_os_string(),
    ];

    if audio_offset > 0.0 {
        args.extend(["-ss".into(), format!("{:.3}", audio_offset).into()]);
    }
    args.extend(["-i".into(), audio.as_os_str().to_os_string()]);

    // 4:2:0 chroma needs even dimensions.
    let (width, height) = store.dimensions();
    if width % 2 == 1 || height % 2 == 1 {
        args.extend(["-vf".into(), "pad=ceil(iw/2)*2:ceil(ih/2)*2".into()]);
    }

    args.extend([
        "-c:v".into(),
        opts.codec.clone().into(),
        "-pix_fmt".into(),
        opts.pix_fmt.clone().into(),
        "-crf".into(),
        opts.crf.to_string().into(),
        "-c:a".into(),
        opts.audio_codec.clone().into(),
        "-b:a".into(),
        opts.audio_bitrate.clone().into(),
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "1:a:0".into(),
        "-shortest".into(),
        output.as_os_str().to_os_string(),
    ]);
    args
}

/// Runs ffmpeg to completion. Only called once every frame is on disk.
pub fn assemble(
    store: &FrameStore,
    audio: &Path,
    audio_offset: f64,
    output: &Path,
    opts: &EncodeOptions,
) -> VisResult<()> {
    if store.is_empty() {
        return Err(VisError::assembly("no frames to assemble"));
    }
    if !is_ffmpeg_on_path() {
        return Err(VisError::assembly("ffmpeg was not found on PATH"));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let args = build_args(store, audio, audio_offset, output, opts);
    log::debug!("ffmpeg {:?}", args);

    let result = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| VisError::assembly(format!("failed to spawn ffmpeg: {}", e)))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(VisError::assembly(format!(
            "ffmpeg exited with {}:\n{}",
            result.status,
            stderr.trim()
        )));
    }

    log::info!(
        "Encoded {} frames @ {}fps into {}",
        store.len(),
        store.fps(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::FeatureSeries;
    use crate::render::pipeline::FramePipeline;
    use image::RgbImage;
    use std::path::PathBuf;

    fn store(width: u32, height: u32) -> (FrameStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "audiovis_ffmpeg_{}_{}x{}_{}",
            std::process::id(),
            width,
            height,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let series = FeatureSeries::new(vec![0.0; 2], 1).unwrap();
        let store = FramePipeline::new(Some(1))
            .run_with(&series, 25, (width, height), &dir, |_, _| {
                Ok(RgbImage::new(width, height))
            })
            .unwrap();
        (store, dir)
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn args_map_frames_then_audio() {
        let (store, dir) = store(4, 4);
        let args = strings(&build_args(
            &store,
            Path::new("song.mp3"),
            0.0,
            Path::new("out/video.mp4"),
            &EncodeOptions::default(),
        ));

        let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
        assert_eq!(args[pos("-framerate") + 1], "25");
        assert!(args[pos("-framerate") + 3].ends_with("%05d.png"));
        assert!(pos("-framerate") < pos("song.mp3"));
        assert_eq!(args[pos("-c:v") + 1], "libx264");
        assert_eq!(args[pos("-pix_fmt") + 1], "yuv420p");
        assert_eq!(args[pos("-crf") + 1], "18");
        assert_eq!(args[pos("-b:a") + 1], "192k");
        assert!(args.contains(&"-shortest".to_string()));
        assert!(!args.contains(&"-ss".to_string()));
        assert!(!args.contains(&"-vf".to_string()));
        assert_eq!(args.last().unwrap(), "out/video.mp4");
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn trimmed_audio_is_seeked_and_odd_sizes_padded() {
        let (store, dir) = store(5, 4);
        let args = strings(&build_args(
            &store,
            Path::new("song.mp3"),
            12.5,
            Path::new("v.mp4"),
            &EncodeOptions::default(),
        ));
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        assert_eq!(args[ss + 1], "12.500");
        assert_eq!(args[ss + 3], "song.mp3");
        assert!(args.contains(&"-vf".to_string()));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: EncodeOptions = toml::from_str("crf = 23\ncodec = \"libx265\"").unwrap();
        assert_eq!(opts.crf, 23);
        assert_eq!(opts.codec, "libx265");
        assert_eq!(opts.pix_fmt, "yuv420p");
        assert_eq!(opts.audio_codec, "aac");
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use audiovis::encode::ffmpeg::EncodeOptions;
use audiovis::VisualizationSettings;

/// Contents of `audiovis.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Same keys as the settings JSON.
    #[serde(default)]
    pub visualization: Option<VisualizationSettings>,
    #[serde(default)]
    pub output: EncodeOptions,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderConfig {
    /// Worker count; unset means one per core, capped.
    pub jobs: Option<usize>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Explicit path, or the first of `./audiovis.toml`,
/// `~/.config/audiovis/config.toml` and the platform config dir that exists.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("audiovis.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("audiovis").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("audiovis").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Reads a settings JSON document without applying it yet.
pub fn load_settings_json(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse settings {}", path.display()))?;
    anyhow::ensure!(
        value.is_object(),
        "Settings {} must contain a JSON object",
        path.display()
    );
    Ok(value)
}

/// Applies the keys present in `patch` on top of `base`; absent keys keep
/// the base value.
pub fn overlay(base: &VisualizationSettings, patch: &serde_json::Value) -> Result<VisualizationSettings> {
    let mut merged = serde_json::to_value(base).context("Failed to serialize settings")?;
    if let (Some(target), Some(source)) = (merged.as_object_mut(), patch.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged).context("Invalid settings")
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiovis::{Style, Visualization};

    #[test]
    fn parses_all_sections() {
        let cfg: Config = toml::from_str(
            r##"
            [visualization]
            visualization = "volume"
            width = 640
            color = "#00ff00"

            [output]
            crf = 22
            audio_bitrate = "320k"

            [render]
            jobs = 3
            "##,
        )
        .unwrap();
        let vis = cfg.visualization.unwrap();
        assert_eq!(vis.visualization, Visualization::Volume);
        assert_eq!(vis.width, 640);
        assert_eq!(vis.height, 480);
        assert_eq!(vis.color.0, [0, 255, 0]);
        assert_eq!(cfg.output.crf, 22);
        assert_eq!(cfg.output.audio_bitrate, "320k");
        assert_eq!(cfg.output.codec, "libx264");
        assert_eq!(cfg.render.jobs, Some(3));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.visualization.is_none());
        assert_eq!(cfg.output, EncodeOptions::default());
        assert_eq!(cfg.render.jobs, None);
    }

    #[test]
    fn overlay_replaces_only_present_keys() {
        let base = VisualizationSettings {
            width: 640,
            style: Style::Bar,
            ..Default::default()
        };
        let patch = serde_json::json!({ "styleVariant": "lcd", "startEnd": [1.5, 4.0] });
        let merged = overlay(&base, &patch).unwrap();
        assert_eq!(merged.width, 640);
        assert_eq!(merged.style, Style::Bar);
        assert_eq!(merged.style_variant, "lcd");
        assert_eq!(merged.start_end, (1.5, Some(4.0)));
    }

    #[test]
    fn overlay_rejects_bad_values() {
        let patch = serde_json::json!({ "color": "red" });
        assert!(overlay(&VisualizationSettings::default(), &patch).is_err());
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = Path::new("/nowhere/custom.toml");
        assert_eq!(find_config(Some(path)), Some(path.to_path_buf()));
    }
}

//! Configuration module.
//!
//! Handles loading, validating, and merging `magick-sizer.toml`. Stock
//! defaults are overridden by the user file, and command-line flags override
//! both.
//!
//! ## Config File Location
//!
//! By default `magick-sizer.toml` is read from the working directory when it
//! exists. `--config <FILE>` points at another file, which then must exist.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! imagemagick_path = "/usr/bin"  # Directory containing `convert` (no default)
//!
//! [defaults]
//! quality = 90            # JPEG quality (1-100)
//! sharpening = "soft"     # none, soft, medium, strong
//! auto_rotate = true      # Apply the EXIF orientation
//! gamma = true            # Scale in linear light
//! cropping = "center"     # Crop-to-fit anchor, or "disabled" to stretch
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Cropping, Quality, Sharpening, TransformRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "magick-sizer.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `magick-sizer.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizerConfig {
    /// Directory containing ImageMagick's `convert`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imagemagick_path: Option<String>,
    /// Transform modifiers used when no flag overrides them.
    pub defaults: DefaultsConfig,
}

/// Stock transform modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub quality: u32,
    pub sharpening: Sharpening,
    pub auto_rotate: bool,
    pub gamma: bool,
    pub cropping: Cropping,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            sharpening: Sharpening::default(),
            auto_rotate: true,
            gamma: true,
            cropping: Cropping::default(),
        }
    }
}

impl DefaultsConfig {
    /// A request for `width` x `height` carrying these defaults.
    pub fn request(&self, width: u32, height: u32) -> TransformRequest {
        TransformRequest {
            auto_rotate: self.auto_rotate,
            sharpening: self.sharpening,
            cropping: self.cropping,
            gamma: self.gamma,
            quality: Quality::new(self.quality),
            ..TransformRequest::new(width, height)
        }
    }
}

impl SizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.defaults.quality) {
            return Err(ConfigError::Validation(
                "defaults.quality must be 1-100".into(),
            ));
        }
        if self
            .imagemagick_path
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "imagemagick_path must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Stock defaults as a TOML value, the base every user file is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SizerConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SizerConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if it exists, stock defaults otherwise.
pub fn load_config(path: &Path) -> Result<SizerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Load a file the user named explicitly. A missing file is an error.
pub fn load_config_file(path: &Path) -> Result<SizerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value()?, Some(overlay))
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# magick-sizer configuration
# ==========================
#
# Place this file as magick-sizer.toml in the directory you run from, or
# pass it with --config. Every key is optional; command-line flags win.

# Directory containing ImageMagick's `convert` (or `convert.exe`).
# Without it nothing can be resized; `magick-sizer check` reports what was found.
# imagemagick_path = "/usr/bin"

[defaults]
# JPEG quality, 1-100. Ignored for PNG and GIF.
quality = 90

# Unsharp mask applied after scaling: none, soft, medium, strong.
sharpening = "soft"

# Apply the EXIF orientation tag before anything else.
auto_rotate = true

# Convert to linear light before scaling and back afterwards.
gamma = true

# Where to crop when the aspect ratio changes:
# center, north, northeast, east, southeast, south, southwest, west, northwest.
# "disabled" stretches to the exact size instead.
cropping = "center"
"##
}

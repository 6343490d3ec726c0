use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "CertiGest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the data directory when set.
pub const DATA_DIR_ENV: &str = "CERTIGEST_DATA_DIR";

/// Get the application data directory.
///
/// `$CERTIGEST_DATA_DIR` when set, otherwise `<platform data dir>/CertiGest`.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite file holding companies and evidence records.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("certigest.db")
}

/// Default destination for exported dossiers.
pub fn exports_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("exports")
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "certigest=info,certigest_lib=info,warn"
}

/// A4 portrait, in PDF points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Page layout for dossier pages built from images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    pub page_width: f32,
    pub page_height: f32,
    /// Blank border kept around images, all sides.
    pub margin: f32,
    pub label_font_size: f32,
    /// Distance from the top edge to the label baseline.
    pub label_offset: f32,
    /// Decode sources on worker threads before the serial append.
    pub parallel_decode: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            margin: 50.0,
            label_font_size: 12.0,
            label_offset: 40.0,
            parallel_decode: true,
        }
    }
}

impl AssemblyConfig {
    pub fn validate(&self) -> Result<(), String> {
        let sizes = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("label_font_size", self.label_font_size),
        ];
        for (name, value) in sizes {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be positive, got {value}"));
            }
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(format!("margin must not be negative, got {}", self.margin));
        }
        if self.page_width - 2.0 * self.margin <= 0.0 || self.page_height - 2.0 * self.margin <= 0.0 {
            return Err("margin leaves no printable area".into());
        }
        // Descenders reach roughly a quarter of the font size below the baseline.
        let label_bottom = self.label_offset + 0.25 * self.label_font_size;
        if !self.label_offset.is_finite() || self.label_offset < self.label_font_size || label_bottom > self.margin {
            return Err("label must sit inside the top margin".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_under_data_dir() {
        let base = Path::new("/tmp/certigest-test");
        assert_eq!(database_path(base), base.join("certigest.db"));
        assert!(exports_dir(base).ends_with("exports"));
    }

    #[test]
    fn app_data_dir_is_named_or_overridden() {
        let dir = app_data_dir();
        match std::env::var_os(DATA_DIR_ENV) {
            Some(v) if !v.is_empty() => assert_eq!(dir, PathBuf::from(v)),
            _ => assert!(dir.ends_with(APP_NAME)),
        }
    }

    #[test]
    fn default_assembly_config_is_a4_and_valid() {
        let config = AssemblyConfig::default();
        assert_eq!(config.page_width, A4_WIDTH_PT);
        assert_eq!(config.margin, 50.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_degenerate_layouts() {
        let too_wide_margin = AssemblyConfig {
            margin: 400.0,
            ..AssemblyConfig::default()
        };
        assert!(too_wide_margin.validate().is_err());

        let zero_page = AssemblyConfig {
            page_width: 0.0,
            ..AssemblyConfig::default()
        };
        assert!(zero_page.validate().is_err());

        let label_in_image_area = AssemblyConfig {
            label_offset: 80.0,
            ..AssemblyConfig::default()
        };
        assert!(label_in_image_area.validate().is_err());

        let label_above_page = AssemblyConfig {
            label_offset: 8.0,
            ..AssemblyConfig::default()
        };
        assert!(label_above_page.validate().is_err());

        let label_at_top_edge = AssemblyConfig {
            label_offset: 12.0,
            ..AssemblyConfig::default()
        };
        assert!(label_at_top_edge.validate().is_ok());
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}

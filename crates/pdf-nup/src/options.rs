use crate::constants::{MARGIN_RANGE, SCALE_RANGE, THICKNESS_RANGE};
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Divider lines drawn between cells
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DividerStyle {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: DividerKind,
    /// `#rrggbb`; malformed values render black
    pub color: String,
    /// Stroke width in points
    pub thickness: f32,
}

impl Default for DividerStyle {
    fn default() -> Self {
        Self {
            kind: DividerKind::Cross,
            color: "#000000".to_string(),
            thickness: 1.0,
        }
    }
}

impl DividerStyle {
    pub fn none() -> Self {
        Self {
            kind: DividerKind::None,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.kind != DividerKind::None
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::from_hex(&self.color)
    }
}

/// Sheet layout configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct LayoutConfig {
    pub layout_type: LayoutType,
    #[cfg_attr(feature = "serde", serde(rename = "pageOrientation"))]
    pub orientation: Orientation,
    /// Margin around the grid in points
    pub margin: f32,
    /// Multiplier applied on top of the aspect fit, in (0, 1]
    pub scale: f32,
    pub divider_style: DividerStyle,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            layout_type: LayoutType::TwoByTwo,
            orientation: Orientation::Portrait,
            margin: 10.0,
            scale: 0.9,
            divider_style: DividerStyle::default(),
        }
    }
}

impl LayoutConfig {
    /// Clamp user-facing values into the ranges the UI offers.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.margin = clamp_or(self.margin, MARGIN_RANGE, MARGIN_RANGE.0);
        config.scale = clamp_or(self.scale, SCALE_RANGE, SCALE_RANGE.1);
        if config.divider_style.is_enabled() {
            config.divider_style.thickness =
                clamp_or(self.divider_style.thickness, THICKNESS_RANGE, 1.0);
        }
        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ComposeError::Config(format!(
                "Margin must be a non-negative number, got {}",
                self.margin
            )));
        }

        if !self.scale.is_finite() || self.scale <= 0.0 || self.scale > 1.0 {
            return Err(ComposeError::Config(format!(
                "Scale must be in (0, 1], got {}",
                self.scale
            )));
        }

        let thickness = self.divider_style.thickness;
        if !thickness.is_finite() || thickness < 0.0 {
            return Err(ComposeError::Config(format!(
                "Divider thickness must be a non-negative number, got {}",
                thickness
            )));
        }

        let (width, height) = self.orientation.sheet_size();
        if 2.0 * self.margin >= width.min(height) {
            return Err(ComposeError::Config(format!(
                "Margin {} leaves no printable area on a {}x{} sheet",
                self.margin, width, height
            )));
        }

        Ok(())
    }
}

fn clamp_or(value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Document ordering configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct SortConfig {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

/// Everything needed to run one composite job
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase", default)
)]
pub struct ComposeOptions {
    pub layout: LayoutConfig,
    pub sort: SortConfig,
}

impl ComposeOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ComposeError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()
    }
}

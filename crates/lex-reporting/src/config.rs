//! Configuration types for the reporting pipeline.
//!
//! Use [`ReportConfig::builder()`] for a validated configuration, or
//! deserialize one with serde and call [`ReportConfig::validate`].

use serde::{Deserialize, Serialize};

/// Default upper bound on input size (50 MB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Smallest chart edge, in pixels.
pub const MIN_CHART_SIDE: u32 = 100;

/// Largest chart edge, in pixels. Charts are rendered into an RGB buffer of
/// `width * height * 3` bytes.
pub const MAX_CHART_SIDE: u32 = 4_000;

/// Bucket width used when computing period-over-period trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendGranularity {
    Day,
    /// ISO week, starting Monday.
    Week,
    #[default]
    Month,
}

impl TrendGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "daily",
            Self::Week => "weekly",
            Self::Month => "monthly",
        }
    }
}

/// Ratios used by the schema profiler to classify columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilerThresholds {
    /// Minimum share of non-null values that must parse as numbers.
    /// Default: 0.9
    pub numeric_ratio: f64,
    /// Minimum share of non-null values that must parse as dates.
    /// Default: 0.9
    pub temporal_ratio: f64,
    /// Distinct/row ratio below which a column is categorical.
    /// Default: 0.5
    pub categorical_ratio: f64,
}

impl Default for ProfilerThresholds {
    fn default() -> Self {
        Self {
            numeric_ratio: 0.9,
            temporal_ratio: 0.9,
            categorical_ratio: 0.5,
        }
    }
}

/// Relative weights of the quality score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Weight of `1 - duplicate ratio`.
    pub uniqueness: f64,
    /// Weight of `1 - null ratio`.
    pub completeness: f64,
    /// Weight of the type-coercion success ratio.
    pub validity: f64,
}

impl QualityWeights {
    pub fn total(&self) -> f64 {
        self.uniqueness + self.completeness + self.validity
    }
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            uniqueness: 1.0 / 3.0,
            completeness: 1.0 / 3.0,
            validity: 1.0 / 3.0,
        }
    }
}

/// Branding and visual settings shared by the report builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStyle {
    pub company_name: String,
    pub author: String,
    pub title: String,
    /// Hex colours (`#rrggbb`). The first entry is the primary colour used
    /// for headers and chart series.
    pub palette: Vec<String>,
    /// Chart bitmap size in pixels.
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            company_name: "Business Analytics Corp".to_string(),
            author: "Analytics Team".to_string(),
            title: "Business Intelligence Report".to_string(),
            palette: vec![
                "#1f77b4".to_string(),
                "#28a745".to_string(),
                "#ffc107".to_string(),
                "#dc3545".to_string(),
            ],
            chart_width: 800,
            chart_height: 400,
        }
    }
}

impl ReportStyle {
    /// Palette entry `index` (wrapping) as an RGB triple.
    ///
    /// Falls back to black when the entry is malformed; [`ReportConfig::validate`]
    /// rejects such palettes up front.
    pub fn color(&self, index: usize) -> (u8, u8, u8) {
        if self.palette.is_empty() {
            return (0, 0, 0);
        }
        parse_hex_color(&self.palette[index % self.palette.len()]).unwrap_or((0, 0, 0))
    }

    pub fn primary_color(&self) -> (u8, u8, u8) {
        self.color(0)
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Configuration for the reporting pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use lex_reporting::config::{ReportConfig, TrendGranularity};
///
/// let config = ReportConfig::builder()
///     .top_n(5)
///     .trend_granularity(TrendGranularity::Week)
///     .company_name("Acme Retail")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Largest accepted input in bytes.
    /// Default: 50 MB
    pub max_file_size_bytes: u64,

    /// Column classification thresholds.
    pub profiler: ProfilerThresholds,

    /// Missing ratio above which text and temporal columns are flagged.
    /// Default: 0.5 (50%)
    pub missing_value_threshold: f64,

    /// Number of categories listed per categorical column.
    /// Default: 10
    pub top_n: usize,

    /// Bucket width for trend computation.
    /// Default: Month
    pub trend_granularity: TrendGranularity,

    /// Half-width, in percent, of the band classified as flat.
    /// Default: 1.0
    pub flat_band_pct: f64,

    /// Quality score weights.
    pub quality_weights: QualityWeights,

    /// Branding and chart settings.
    pub style: ReportStyle,

    /// Base of the generated artifact file names.
    /// Default: "Report"
    pub output_base_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            profiler: ProfilerThresholds::default(),
            missing_value_threshold: 0.5,
            top_n: 10,
            trend_granularity: TrendGranularity::default(),
            flat_band_pct: 1.0,
            quality_weights: QualityWeights::default(),
            style: ReportStyle::default(),
            output_base_name: "Report".to_string(),
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.max_file_size_bytes == 0 {
            return Err(ConfigValidationError::InvalidSizeLimit);
        }

        let ratios = [
            ("profiler.numeric_ratio", self.profiler.numeric_ratio),
            ("profiler.temporal_ratio", self.profiler.temporal_ratio),
            ("profiler.categorical_ratio", self.profiler.categorical_ratio),
            ("missing_value_threshold", self.missing_value_threshold),
        ];
        for (field, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if self.top_n == 0 {
            return Err(ConfigValidationError::InvalidTopN(self.top_n));
        }

        if !self.flat_band_pct.is_finite() || self.flat_band_pct < 0.0 {
            return Err(ConfigValidationError::InvalidFlatBand(self.flat_band_pct));
        }

        let w = &self.quality_weights;
        let components = [w.uniqueness, w.completeness, w.validity];
        if components.iter().any(|v| !v.is_finite() || *v < 0.0) || w.total() <= 0.0 {
            return Err(ConfigValidationError::InvalidWeights {
                uniqueness: w.uniqueness,
                completeness: w.completeness,
                validity: w.validity,
            });
        }

        if self.style.palette.is_empty() {
            return Err(ConfigValidationError::EmptyPalette);
        }
        if let Some(bad) = self
            .style
            .palette
            .iter()
            .find(|c| parse_hex_color(c).is_none())
        {
            return Err(ConfigValidationError::InvalidColor(bad.clone()));
        }

        let side_ok = |side: u32| (MIN_CHART_SIDE..=MAX_CHART_SIDE).contains(&side);
        if !side_ok(self.style.chart_width) || !side_ok(self.style.chart_height) {
            return Err(ConfigValidationError::InvalidChartSize {
                width: self.style.chart_width,
                height: self.style.chart_height,
            });
        }

        if self.output_base_name.trim().is_empty()
            || self
                .output_base_name
                .contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|'])
        {
            return Err(ConfigValidationError::InvalidBaseName(
                self.output_base_name.clone(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid top-N: {0} (must be at least 1)")]
    InvalidTopN(usize),

    #[error("Invalid flat band: {0} (must be a non-negative percentage)")]
    InvalidFlatBand(f64),

    #[error(
        "Invalid quality weights ({uniqueness}, {completeness}, {validity}): weights must be non-negative with a positive sum"
    )]
    InvalidWeights {
        uniqueness: f64,
        completeness: f64,
        validity: f64,
    },

    #[error("Maximum file size must be greater than zero")]
    InvalidSizeLimit,

    #[error("Chart palette must contain at least one colour")]
    EmptyPalette,

    #[error("Invalid palette colour '{0}' (expected #rrggbb)")]
    InvalidColor(String),

    #[error("Invalid chart size {width}x{height} (each side must be 100 to 4000 pixels)")]
    InvalidChartSize { width: u32, height: u32 },

    #[error("Invalid output base name '{0}'")]
    InvalidBaseName(String),
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    max_file_size_bytes: Option<u64>,
    profiler: Option<ProfilerThresholds>,
    missing_value_threshold: Option<f64>,
    top_n: Option<usize>,
    trend_granularity: Option<TrendGranularity>,
    flat_band_pct: Option<f64>,
    quality_weights: Option<QualityWeights>,
    style: Option<ReportStyle>,
    company_name: Option<String>,
    author: Option<String>,
    palette: Option<Vec<String>>,
    output_base_name: Option<String>,
}

impl ReportConfigBuilder {
    /// Set the largest accepted input size in bytes.
    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = Some(bytes);
        self
    }

    /// Set the largest accepted input size in megabytes.
    pub fn max_file_size_mb(self, megabytes: u64) -> Self {
        self.max_file_size_bytes(megabytes.saturating_mul(1024 * 1024))
    }

    /// Set the profiler classification thresholds.
    pub fn profiler_thresholds(mut self, thresholds: ProfilerThresholds) -> Self {
        self.profiler = Some(thresholds);
        self
    }

    /// Set the missing ratio above which text/temporal columns are flagged.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.5 = 50%)
    pub fn missing_value_threshold(mut self, threshold: f64) -> Self {
        self.missing_value_threshold = Some(threshold);
        self
    }

    /// Set the number of categories reported per categorical column.
    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    pub fn trend_granularity(mut self, granularity: TrendGranularity) -> Self {
        self.trend_granularity = Some(granularity);
        self
    }

    /// Set the flat band half-width in percent (1.0 = ±1%).
    pub fn flat_band_pct(mut self, pct: f64) -> Self {
        self.flat_band_pct = Some(pct);
        self
    }

    pub fn quality_weights(mut self, weights: QualityWeights) -> Self {
        self.quality_weights = Some(weights);
        self
    }

    /// Replace the whole style. Branding setters below override its fields.
    pub fn style(mut self, style: ReportStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn palette(mut self, palette: Vec<String>) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Set the artifact file name base (without timestamp or extension).
    pub fn output_base_name(mut self, name: impl Into<String>) -> Self {
        self.output_base_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let defaults = ReportConfig::default();
        let mut style = self.style.unwrap_or(defaults.style);
        if let Some(name) = self.company_name {
            style.company_name = name;
        }
        if let Some(author) = self.author {
            style.author = author;
        }
        if let Some(palette) = self.palette {
            style.palette = palette;
        }

        let config = ReportConfig {
            max_file_size_bytes: self
                .max_file_size_bytes
                .unwrap_or(defaults.max_file_size_bytes),
            profiler: self.profiler.unwrap_or(defaults.profiler),
            missing_value_threshold: self
                .missing_value_threshold
                .unwrap_or(defaults.missing_value_threshold),
            top_n: self.top_n.unwrap_or(defaults.top_n),
            trend_granularity: self.trend_granularity.unwrap_or_default(),
            flat_band_pct: self.flat_band_pct.unwrap_or(defaults.flat_band_pct),
            quality_weights: self.quality_weights.unwrap_or_default(),
            style,
            output_base_name: self
                .output_base_name
                .unwrap_or(defaults.output_base_name),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.max_file_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.profiler.numeric_ratio, 0.9);
        assert_eq!(config.profiler.categorical_ratio, 0.5);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.flat_band_pct, 1.0);
        assert_eq!(config.trend_granularity, TrendGranularity::Month);
        assert!((config.quality_weights.total() - 1.0).abs() < 1e-12);
        assert_eq!(config.style.company_name, "Business Analytics Corp");
    }

    #[test]
    fn test_builder_defaults() {
        let config = ReportConfig::builder().build().unwrap();
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ReportConfig::builder()
            .max_file_size_mb(10)
            .top_n(3)
            .trend_granularity(TrendGranularity::Week)
            .flat_band_pct(2.5)
            .company_name("Acme Retail")
            .author("Finance")
            .output_base_name("weekly")
            .build()
            .unwrap();

        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.trend_granularity, TrendGranularity::Week);
        assert_eq!(config.flat_band_pct, 2.5);
        assert_eq!(config.style.company_name, "Acme Retail");
        assert_eq!(config.style.author, "Finance");
        assert_eq!(config.output_base_name, "weekly");
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = ReportConfig::builder().missing_value_threshold(1.5).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_invalid_top_n() {
        let result = ReportConfig::builder().top_n(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidTopN(0)
        ));
    }

    #[test]
    fn test_validation_invalid_weights() {
        let zero = QualityWeights {
            uniqueness: 0.0,
            completeness: 0.0,
            validity: 0.0,
        };
        assert!(matches!(
            ReportConfig::builder().quality_weights(zero).build().unwrap_err(),
            ConfigValidationError::InvalidWeights { .. }
        ));

        let negative = QualityWeights {
            uniqueness: 1.0,
            completeness: -0.5,
            validity: 1.0,
        };
        assert!(ReportConfig::builder().quality_weights(negative).build().is_err());
    }

    #[test]
    fn test_validation_palette() {
        assert!(matches!(
            ReportConfig::builder().palette(vec![]).build().unwrap_err(),
            ConfigValidationError::EmptyPalette
        ));
        assert!(matches!(
            ReportConfig::builder()
                .palette(vec!["#12345".to_string()])
                .build()
                .unwrap_err(),
            ConfigValidationError::InvalidColor(_)
        ));
    }

    #[test]
    fn test_validation_chart_size() {
        let sized = |width, height| ReportStyle {
            chart_width: width,
            chart_height: height,
            ..ReportStyle::default()
        };
        assert!(ReportConfig::builder().style(sized(MAX_CHART_SIDE, MIN_CHART_SIDE)).build().is_ok());
        assert!(matches!(
            ReportConfig::builder().style(sized(99, 400)).build().unwrap_err(),
            ConfigValidationError::InvalidChartSize { width: 99, height: 400 }
        ));
        assert!(matches!(
            ReportConfig::builder()
                .style(sized(800, u32::MAX))
                .build()
                .unwrap_err(),
            ConfigValidationError::InvalidChartSize { .. }
        ));
    }

    #[test]
    fn test_validation_base_name() {
        assert!(ReportConfig::builder().output_base_name("a/b").build().is_err());
        assert!(ReportConfig::builder().output_base_name("  ").build().is_err());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#1f77b4"), Some((0x1f, 0x77, 0xb4)));
        assert_eq!(parse_hex_color("28A745"), Some((0x28, 0xa7, 0x45)));
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(ReportStyle::default().primary_color(), (0x1f, 0x77, 0xb4));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "max_file_size_bytes": 1048576,
            "missing_value_threshold": 0.3,
            "top_n": 5,
            "trend_granularity": "day",
            "flat_band_pct": 0.5,
            "quality_weights": {"uniqueness": 0.5, "completeness": 0.25, "validity": 0.25},
            "output_base_name": "Sales"
        }"#;

        let config: ReportConfig = serde_json::from_str(json).expect("Should deserialize");
        config.validate().unwrap();

        assert_eq!(config.max_file_size_bytes, 1_048_576);
        assert_eq!(config.missing_value_threshold, 0.3);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.trend_granularity, TrendGranularity::Day);
        assert_eq!(config.quality_weights.uniqueness, 0.5);
        assert_eq!(config.output_base_name, "Sales");
        // omitted fields fall back to defaults
        assert_eq!(config.profiler, ProfilerThresholds::default());
        assert_eq!(config.style, ReportStyle::default());
    }
}

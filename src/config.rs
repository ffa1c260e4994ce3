//! Immutable analysis configuration.
//!
//! Every table the pipelines consult (region codes, colors, sensor periods,
//! the arch sentinel) lives here and is passed explicitly to the stages that
//! need it. Defaults reproduce the Baffin Bay study setup; a JSON file may
//! override any subset of fields:
//! ```json
//! {
//!   "period": 5,
//!   "sentinel": "no arch",
//!   "region_codes": { "Lancaster": "LS", "Jones": "JS", "Smith": "SS" },
//!   "sensor_periods": [
//!     { "start": "1998-01-01", "end": "2003-12-31", "color": "#5DCACF", "label": "SeaWiFS" }
//!   ]
//! }
//! ```

use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

/// What to do when the primary table holds two rows for the same region and month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Abort the run with an alignment error.
    #[default]
    Reject,
    /// Later rows (in file order) replace earlier ones.
    KeepLast,
}

/// An sRGB color parsed from `#RRGGBB` or a small set of names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            return Some(Rgb(channel(0)?, channel(2)?, channel(4)?));
        }

        // matplotlib's named colors used by the study scripts
        match s.to_ascii_lowercase().as_str() {
            "black" => Some(Rgb(0, 0, 0)),
            "white" => Some(Rgb(255, 255, 255)),
            "gray" | "grey" => Some(Rgb(128, 128, 128)),
            "blue" => Some(Rgb(0, 0, 255)),
            "orange" => Some(Rgb(255, 165, 0)),
            "green" => Some(Rgb(0, 128, 0)),
            "red" => Some(Rgb(255, 0, 0)),
            _ => None,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value).ok_or_else(|| format!("unrecognized color '{value}'"))
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Translates full region names used in the chlorophyll table into the
/// abbreviations used by the arch table.
///
/// A name that is not in the table is its own code: `code_for("Baffin")`
/// returns `"Baffin"`. This lets single-region inputs whose keys already
/// match the arch table work without any mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCodes {
    entries: BTreeMap<String, String>,
}

impl RegionCodes {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the arch-table code for `region`, falling back to `region` itself.
    pub fn code_for<'a>(&'a self, region: &'a str) -> &'a str {
        self.entries.get(region).map(String::as_str).unwrap_or(region)
    }

    /// Reverse lookup: the region name that maps to `code`, if any.
    pub fn region_for(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, c)| c.as_str() == code)
            .map(|(r, _)| r.as_str())
    }

    /// Iterates over all `(region, code)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn ensure_bijective(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (region, code) in self.iter() {
            if !seen.insert(code) {
                return Err(ConfigError::Validation(format!(
                    "region code '{code}' is assigned to more than one region (including '{region}')"
                )));
            }
        }
        Ok(())
    }
}

impl Default for RegionCodes {
    fn default() -> Self {
        Self::new([("Lancaster", "LS"), ("Jones", "JS"), ("Smith", "SS")])
    }
}

/// A sensor-coverage period, used only to color line segments.
///
/// The range is half-open: a point at `end` belongs to the next period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub color: Rgb,
    pub label: String,
}

impl SensorPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

fn default_sensor_periods() -> Vec<SensorPeriod> {
    [
        ((1998, 1, 1), (2003, 12, 31), Rgb(0x5D, 0xCA, 0xCF), "SeaWiFS"),
        ((2003, 1, 1), (2008, 12, 31), Rgb(0x48, 0x87, 0x59), "SeaWiFS + MODIS + MERIS"),
        ((2008, 1, 1), (2012, 12, 31), Rgb(0xE8, 0xA7, 0x69), "MERIS + MODIS"),
        ((2012, 1, 1), (2016, 12, 31), Rgb(0xBF, 0x62, 0x5F), "MODIS"),
        ((2016, 1, 1), (2020, 12, 31), Rgb::BLACK, "MODISS3A-OLCI"),
    ]
    .into_iter()
    .filter_map(|((sy, sm, sd), (ey, em, ed), color, label)| {
        Some(SensorPeriod {
            start: NaiveDate::from_ymd_opt(sy, sm, sd)?,
            end: NaiveDate::from_ymd_opt(ey, em, ed)?,
            color,
            label: label.to_string(),
        })
    })
    .collect()
}

/// Settings shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Seasonal period of the additive decomposition.
    ///
    /// 5 suits the irregular mixed-sensor sampling of the study data; it is
    /// not a general monthly default.
    pub period: usize,
    /// Arch status that marks a year, compared trimmed and case-insensitively.
    pub sentinel: String,
    pub duplicate_policy: DuplicatePolicy,
    /// Region key given to rows of a table without a `Region` column.
    pub single_series_key: String,
    pub region_codes: RegionCodes,
    pub region_colors: BTreeMap<String, Rgb>,
    pub fallback_color: Rgb,
    pub sensor_periods: Vec<SensorPeriod>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period: 5,
            sentinel: "no arch".to_string(),
            duplicate_policy: DuplicatePolicy::Reject,
            single_series_key: "All".to_string(),
            region_codes: RegionCodes::default(),
            region_colors: BTreeMap::from([
                ("Lancaster".to_string(), Rgb(0, 0, 255)),
                ("Jones".to_string(), Rgb(255, 165, 0)),
                ("Smith".to_string(), Rgb(0, 128, 0)),
            ]),
            fallback_color: Rgb::BLACK,
            sensor_periods: default_sensor_periods(),
        }
    }
}

impl AnalysisConfig {
    /// Loads a JSON config from `path`. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AnalysisConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period < 2 {
            return Err(ConfigError::Validation(format!(
                "period must be at least 2, got {}",
                self.period
            )));
        }
        if self.sentinel.trim().is_empty() {
            return Err(ConfigError::Validation("sentinel must not be empty".into()));
        }
        self.region_codes.ensure_bijective()?;
        for p in &self.sensor_periods {
            if p.start >= p.end {
                return Err(ConfigError::Validation(format!(
                    "sensor period '{}' starts on or after its end",
                    p.label
                )));
            }
        }
        Ok(())
    }

    /// Line color for a region, or the fallback color when none is configured.
    pub fn region_color(&self, region: &str) -> Rgb {
        self.region_colors
            .get(region)
            .copied()
            .unwrap_or(self.fallback_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_region_codes_round_trip() {
        let codes = RegionCodes::default();
        for (region, code) in [("Lancaster", "LS"), ("Jones", "JS"), ("Smith", "SS")] {
            assert_eq!(codes.code_for(region), code);
            assert_eq!(codes.region_for(code), Some(region));
        }
    }

    #[test]
    fn test_unmapped_region_is_its_own_code() {
        let codes = RegionCodes::default();
        assert_eq!(codes.code_for("Baffin"), "Baffin");
        assert_eq!(codes.region_for("BB"), None);
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#5DCACF"), Some(Rgb(0x5D, 0xCA, 0xCF)));
        assert_eq!(Rgb::parse("orange"), Some(Rgb(255, 165, 0)));
        assert_eq!(Rgb::parse("#12345"), None);
        assert_eq!(Rgb::parse("teal-ish"), None);
        assert_eq!(Rgb(0x48, 0x87, 0x59).to_string(), "#488759");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        config.validate().unwrap();
        assert_eq!(config.period, 5);
        assert_eq!(config.sensor_periods.len(), 5);
        assert_eq!(config.region_color("Jones"), Rgb(255, 165, 0));
        assert_eq!(config.region_color("Baffin"), Rgb::BLACK);
    }

    #[test]
    fn test_sensor_period_is_half_open() {
        let period = &AnalysisConfig::default().sensor_periods[0];
        assert!(period.contains(NaiveDate::from_ymd_opt(1998, 1, 1).unwrap()));
        assert!(period.contains(NaiveDate::from_ymd_opt(2003, 12, 1).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2003, 12, 31).unwrap()));
    }

    #[test]
    fn test_load_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "period": 12, "duplicate_policy": "keep-last", "fallback_color": "gray" }}"#
        )
        .unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert_eq!(config.period, 12);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepLast);
        assert_eq!(config.fallback_color, Rgb(128, 128, 128));
        assert_eq!(config.sentinel, "no arch");
        assert_eq!(config.region_codes.code_for("Smith"), "SS");
    }

    #[test]
    fn test_load_rejects_non_bijective_codes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "region_codes": {{ "Lancaster": "LS", "Lancaster Sound": "LS" }} }}"#
        )
        .unwrap();

        assert_matches!(
            AnalysisConfig::load(file.path()),
            Err(ConfigError::Validation(_))
        );
    }

    #[test]
    fn test_load_rejects_small_period() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "period": 1 }}"#).unwrap();

        assert_matches!(
            AnalysisConfig::load(file.path()),
            Err(ConfigError::Validation(_))
        );
    }
}

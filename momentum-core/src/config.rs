//! Screener configuration (TOML).
//!
//! Every section is optional. The lookback policy is always explicit: the
//! calendar-hour and trading-day windows answer different questions ("1M"
//! is 720 wall-clock hours in one, 22 bars in the other) and are never
//! mixed implicitly.

use crate::data::{HistoryRange, HistoryRequest, Interval};
use crate::domain::{Lookback, LookbackError, LookbackSet};
use crate::engine::EngineParams;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown lookback policy '{0}' (expected calendar-hours, trading-days or custom)")]
    UnknownPolicy(String),

    #[error("policy 'custom' requires at least one [[lookbacks]] entry")]
    CustomWithoutLookbacks,

    #[error("[[lookbacks]] entries are only allowed with policy = \"custom\" (policy is '{0}')")]
    LookbacksWithPreset(LookbackPolicy),

    #[error("lookback '{0}' must set exactly one of hours, days or bars")]
    AmbiguousLookback(String),

    #[error("universe source 'file' and 'toml' require a path")]
    MissingUniversePath,

    #[error(transparent)]
    Lookback(#[from] LookbackError),
}

/// Which family of lookback windows to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookbackPolicy {
    /// 1H / 1W / 1M / 1Y as wall-clock hours over hourly bars.
    #[default]
    CalendarHours,
    /// 1D / 1W / 1M / 3M / 1Y as bar counts over daily bars.
    TradingDays,
    /// Lookbacks listed in the config file.
    Custom,
}

impl LookbackPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CalendarHours => "calendar-hours",
            Self::TradingDays => "trading-days",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for LookbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookbackPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "calendar-hours" => Ok(Self::CalendarHours),
            "trading-days" => Ok(Self::TradingDays),
            "custom" => Ok(Self::Custom),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// S&P 500 constituents from Wikipedia.
    #[default]
    Wikipedia,
    /// Built-in sector universe.
    Default,
    /// Plain-text list, one ticker per line.
    File,
    /// Sector universe TOML file.
    Toml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UniverseConfig {
    pub source: SourceKind,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Defaults to the policy's range.
    pub range: Option<HistoryRange>,
    /// Defaults to the policy's interval.
    pub interval: Option<Interval>,
    /// Delay between consecutive symbol requests.
    pub pacing_ms: u64,
    /// How long the symbol list stays cached between refreshes.
    pub cache_ttl_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            range: None,
            interval: None,
            pacing_ms: 200,
            cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Defaults to the policy's minimum.
    pub min_observations: Option<usize>,
}

/// One `[[lookbacks]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LookbackConfig {
    pub name: String,
    pub hours: Option<i64>,
    pub days: Option<i64>,
    pub bars: Option<usize>,
}

impl LookbackConfig {
    fn to_lookback(&self) -> Result<Lookback, ConfigError> {
        match (self.hours, self.days, self.bars) {
            (Some(h), None, None) => Ok(Lookback::hours(&self.name, h)?),
            (None, Some(d), None) => Ok(Lookback::days(&self.name, d)?),
            (None, None, Some(n)) => Ok(Lookback::count(&self.name, n)?),
            _ => Err(ConfigError::AmbiguousLookback(self.name.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenerConfig {
    pub policy: LookbackPolicy,
    pub fetch: FetchConfig,
    pub universe: UniverseConfig,
    pub engine: EngineConfig,
    pub lookbacks: Vec<LookbackConfig>,
}

/// Validated settings ready to drive a scan.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub policy: LookbackPolicy,
    pub lookbacks: LookbackSet,
    pub params: EngineParams,
    pub request: HistoryRequest,
    pub pacing: Duration,
    pub cache_ttl: Duration,
    pub universe: UniverseConfig,
}

impl ScreenerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let (lookbacks, request, min_observations) = match self.policy {
            LookbackPolicy::CalendarHours | LookbackPolicy::TradingDays
                if !self.lookbacks.is_empty() =>
            {
                return Err(ConfigError::LookbacksWithPreset(self.policy));
            }
            LookbackPolicy::CalendarHours => {
                (LookbackSet::calendar_hours(), HistoryRequest::hourly_year(), 24 * 5)
            }
            LookbackPolicy::TradingDays => {
                (LookbackSet::trading_days(), HistoryRequest::daily_two_years(), 2)
            }
            LookbackPolicy::Custom => {
                if self.lookbacks.is_empty() {
                    return Err(ConfigError::CustomWithoutLookbacks);
                }
                let lookbacks = self
                    .lookbacks
                    .iter()
                    .map(LookbackConfig::to_lookback)
                    .collect::<Result<Vec<_>, _>>()?;
                (LookbackSet::new(lookbacks)?, HistoryRequest::hourly_year(), 1)
            }
        };

        if matches!(self.universe.source, SourceKind::File | SourceKind::Toml)
            && self.universe.path.is_none()
        {
            return Err(ConfigError::MissingUniversePath);
        }

        let request = HistoryRequest::new(
            self.fetch.range.unwrap_or(request.range),
            self.fetch.interval.unwrap_or(request.interval),
        );

        Ok(ResolvedConfig {
            policy: self.policy,
            lookbacks,
            params: EngineParams::with_min_observations(
                self.engine.min_observations.unwrap_or(min_observations),
            ),
            request,
            pacing: Duration::from_millis(self.fetch.pacing_ms),
            cache_ttl: Duration::from_secs(self.fetch.cache_ttl_secs),
            universe: self.universe.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LookbackKind;

    #[test]
    fn empty_config_is_calendar_hours() {
        let resolved = ScreenerConfig::from_toml("").unwrap().resolve().unwrap();
        assert_eq!(resolved.policy, LookbackPolicy::CalendarHours);
        assert_eq!(resolved.lookbacks.names(), vec!["1H", "1W", "1M", "1Y"]);
        assert_eq!(resolved.params.min_observations, 120);
        assert_eq!(resolved.request, HistoryRequest::hourly_year());
        assert_eq!(resolved.pacing, Duration::from_millis(200));
        assert_eq!(resolved.universe.source, SourceKind::Wikipedia);
    }

    #[test]
    fn trading_days_preset_with_overrides() {
        let cfg = ScreenerConfig::from_toml(
            r#"
            policy = "trading-days"

            [fetch]
            range = "5y"
            pacing_ms = 0

            [engine]
            min_observations = 30
            "#,
        )
        .unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(
            resolved.lookbacks.get("1M").unwrap().kind(),
            LookbackKind::Count(22)
        );
        assert_eq!(
            resolved.request,
            HistoryRequest::new(HistoryRange::Years5, Interval::Day1)
        );
        assert_eq!(resolved.params.min_observations, 30);
        assert!(resolved.pacing.is_zero());
    }

    #[test]
    fn custom_lookbacks_resolve_in_order() {
        let cfg = ScreenerConfig::from_toml(
            r#"
            policy = "custom"

            [[lookbacks]]
            name = "1D"
            hours = 24

            [[lookbacks]]
            name = "2W"
            days = 14

            [[lookbacks]]
            name = "10B"
            bars = 10
            "#,
        )
        .unwrap();
        let resolved = cfg.resolve().unwrap();
        assert_eq!(resolved.lookbacks.names(), vec!["1D", "2W", "10B"]);
        assert_eq!(
            resolved.lookbacks.get("2W").unwrap().kind(),
            LookbackKind::Elapsed(chrono::Duration::days(14))
        );
    }

    #[test]
    fn policies_are_never_mixed() {
        let cfg = ScreenerConfig::from_toml(
            "[[lookbacks]]\nname = \"1W\"\nbars = 5\n",
        )
        .unwrap();
        assert!(matches!(
            cfg.resolve(),
            Err(ConfigError::LookbacksWithPreset(LookbackPolicy::CalendarHours))
        ));

        let cfg = ScreenerConfig::from_toml("policy = \"custom\"\n").unwrap();
        assert!(matches!(cfg.resolve(), Err(ConfigError::CustomWithoutLookbacks)));
    }

    #[test]
    fn rejects_ambiguous_and_duplicate_lookbacks() {
        let cfg = ScreenerConfig::from_toml(
            "policy = \"custom\"\n[[lookbacks]]\nname = \"X\"\nhours = 1\nbars = 1\n",
        )
        .unwrap();
        assert!(matches!(cfg.resolve(), Err(ConfigError::AmbiguousLookback(n)) if n == "X"));

        let cfg = ScreenerConfig::from_toml(
            "policy = \"custom\"\n[[lookbacks]]\nname = \"X\"\nhours = 1\n[[lookbacks]]\nname = \"X\"\nbars = 1\n",
        )
        .unwrap();
        assert!(matches!(
            cfg.resolve(),
            Err(ConfigError::Lookback(LookbackError::DuplicateName(_)))
        ));
    }

    #[test]
    fn file_source_needs_path() {
        let cfg = ScreenerConfig::from_toml("[universe]\nsource = \"file\"\n").unwrap();
        assert!(matches!(cfg.resolve(), Err(ConfigError::MissingUniversePath)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ScreenerConfig::from_toml("[fetch]\npacing = 5\n").is_err());
    }

    #[test]
    fn policy_from_str() {
        assert_eq!(
            "trading-days".parse::<LookbackPolicy>().unwrap(),
            LookbackPolicy::TradingDays
        );
        assert!("weekly".parse::<LookbackPolicy>().is_err());
    }
}

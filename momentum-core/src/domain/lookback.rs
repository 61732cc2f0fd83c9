//! Lookbacks: how far back to look for the reference observation.

use chrono::Duration;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookbackError {
    #[error("lookback '{0}' must cover a positive duration")]
    NonPositiveDuration(String),

    #[error("lookback '{0}' duration is out of range")]
    OutOfRange(String),

    #[error("lookback '{0}' must step back at least one observation")]
    ZeroCount(String),

    #[error("lookback name must not be empty")]
    EmptyName,

    #[error("duplicate lookback name '{0}'")]
    DuplicateName(String),

    #[error("at least one lookback is required")]
    Empty,
}

/// Addressing mode for the reference observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackKind {
    /// Wall-clock distance from the latest timestamp.
    Elapsed(Duration),
    /// Sequence positions before the latest observation.
    Count(usize),
}

/// A named lookback, e.g. `"1W"` = 168 hours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookback {
    name: String,
    kind: LookbackKind,
}

impl Lookback {
    pub fn elapsed(name: impl Into<String>, duration: Duration) -> Result<Self, LookbackError> {
        let name = checked_name(name.into())?;
        if duration <= Duration::zero() {
            return Err(LookbackError::NonPositiveDuration(name));
        }
        Ok(Self {
            name,
            kind: LookbackKind::Elapsed(duration),
        })
    }

    pub fn hours(name: impl Into<String>, hours: i64) -> Result<Self, LookbackError> {
        let name = name.into();
        match Duration::try_hours(hours) {
            Some(duration) => Self::elapsed(name, duration),
            None => Err(LookbackError::OutOfRange(name)),
        }
    }

    pub fn days(name: impl Into<String>, days: i64) -> Result<Self, LookbackError> {
        let name = name.into();
        match Duration::try_days(days) {
            Some(duration) => Self::elapsed(name, duration),
            None => Err(LookbackError::OutOfRange(name)),
        }
    }

    pub fn count(name: impl Into<String>, count: usize) -> Result<Self, LookbackError> {
        let name = checked_name(name.into())?;
        if count == 0 {
            return Err(LookbackError::ZeroCount(name));
        }
        Ok(Self {
            name,
            kind: LookbackKind::Count(count),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> LookbackKind {
        self.kind
    }
}

fn checked_name(name: String) -> Result<String, LookbackError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LookbackError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Non-empty, uniquely-named, ordered lookbacks.
///
/// The order is the column order of every table built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookbackSet {
    lookbacks: Vec<Lookback>,
}

impl LookbackSet {
    pub fn new(lookbacks: Vec<Lookback>) -> Result<Self, LookbackError> {
        if lookbacks.is_empty() {
            return Err(LookbackError::Empty);
        }
        let mut seen = HashSet::new();
        for lb in &lookbacks {
            if !seen.insert(lb.name.as_str()) {
                return Err(LookbackError::DuplicateName(lb.name.clone()));
            }
        }
        Ok(Self { lookbacks })
    }

    /// Hourly calendar windows: 1H, 1W (168h), 1M (720h), 1Y (8760h).
    pub fn calendar_hours() -> Self {
        Self {
            lookbacks: [("1H", 1), ("1W", 24 * 7), ("1M", 24 * 30), ("1Y", 24 * 365)]
                .into_iter()
                .map(|(name, h)| Lookback {
                    name: name.to_string(),
                    kind: LookbackKind::Elapsed(Duration::hours(h)),
                })
                .collect(),
        }
    }

    /// Trading-day positions: 1D, 1W (5), 1M (22), 3M (66), 1Y (252).
    pub fn trading_days() -> Self {
        Self {
            lookbacks: [("1D", 1), ("1W", 5), ("1M", 22), ("3M", 66), ("1Y", 252)]
                .into_iter()
                .map(|(name, n)| Lookback {
                    name: name.to_string(),
                    kind: LookbackKind::Count(n),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lookback> {
        self.lookbacks.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.lookbacks.iter().map(|l| l.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Lookback> {
        self.lookbacks.iter().find(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.lookbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookbacks.is_empty()
    }
}

impl<'a> IntoIterator for &'a LookbackSet {
    type Item = &'a Lookback;
    type IntoIter = std::slice::Iter<'a, Lookback>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

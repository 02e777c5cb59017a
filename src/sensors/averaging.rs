//! Averaging strategies over a fixed set of sensor readings.
//!
//! Strategies form a closed set registered in a static table and looked
//! up by name.  Unknown names degrade to [`Mean`] with a warning.

use std::time::Instant;

use log::warn;

/// Total weight below which an aggregate is considered undefined.
pub const WEIGHT_EPSILON: f64 = 1e-10;

/// Name of the built-in default strategy.
pub const DEFAULT_STRATEGY: &str = "mean";

/// Point-in-time copy of one sensor, as seen by a strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub value: f64,
    /// `None` = never observed.
    pub timestamp: Option<Instant>,
    pub weight: f64,
}

/// Result of combining readings.  `timestamp == None` means invalid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub value: f64,
    pub timestamp: Option<Instant>,
}

impl Aggregate {
    pub const NEVER: Self = Self {
        value: 0.0,
        timestamp: None,
    };

    pub fn is_valid(&self) -> bool {
        self.timestamp.is_some()
    }
}

pub trait AveragingStrategy: Sync {
    fn name(&self) -> &'static str;
    fn combine(&self, readings: &[SensorReading]) -> Aggregate;
}

/// Weighted arithmetic mean over observed readings.
///
/// The aggregate timestamp is the newest constituent timestamp, so it only
/// moves when some sensor actually reported.
pub struct Mean;

impl AveragingStrategy for Mean {
    fn name(&self) -> &'static str {
        DEFAULT_STRATEGY
    }

    fn combine(&self, readings: &[SensorReading]) -> Aggregate {
        let mut sum = 0.0;
        let mut total_weight = 0.0;
        let mut newest: Option<Instant> = None;

        for r in readings {
            let Some(ts) = r.timestamp else { continue };
            sum += r.value * r.weight;
            total_weight += r.weight;
            newest = Some(newest.map_or(ts, |n| n.max(ts)));
        }

        if total_weight < WEIGHT_EPSILON {
            return Aggregate::NEVER;
        }
        Aggregate {
            value: sum / total_weight,
            timestamp: newest,
        }
    }
}

static STRATEGIES: &[&dyn AveragingStrategy] = &[&Mean];

/// Exact lookup in the strategy table.
pub fn lookup(name: &str) -> Option<&'static dyn AveragingStrategy> {
    STRATEGIES.iter().copied().find(|s| s.name() == name)
}

/// Lookup with fallback to the default strategy.  `owner` names the
/// entity for the warning.
pub fn resolve(name: &str, owner: &str) -> &'static dyn AveragingStrategy {
    match lookup(name) {
        Some(strategy) => strategy,
        None => {
            warn!(
                "{}: unknown average type `{}`, reverting to `{}`",
                owner, name, DEFAULT_STRATEGY
            );
            &Mean
        }
    }
}

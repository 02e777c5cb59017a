//! Cross-zone aggregation: many zone demands → one boiler command.
//!
//! Zones close to the hottest demand dominate.  Everything at or above a
//! cutoff (70 % of the way from the coolest real demand to the hottest) is
//! combined as a weighted cubic mean, rounded to 0.5 °C and bounded.
//!
//! Input order is configuration order; strict comparisons make the first
//! zone win every tie.

use super::thermal_model::{FALLBACK_TSET, bound};
use crate::app::events::{BoilerCommand, DEFAULT_TSET};
use crate::diagnostics::{AggregationReport, DemandRecord};

/// Central heating is enabled at or above this Tset.
pub const MIN_ENABLE_TEMP: f64 = 18.0;

/// Position of the cutoff between the min and max demand.
pub const CUTOFF_FRACTION: f64 = 0.7;

/// One zone with a currently valid demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneDemand<'a> {
    pub name: &'a str,
    pub demand: f64,
    pub weight: f64,
    pub setpoint: f64,
    pub temperature: f64,
}

impl ZoneDemand<'_> {
    fn gap(&self) -> f64 {
        self.setpoint - self.temperature
    }

    fn record(&self, demand_value: f64) -> DemandRecord {
        DemandRecord {
            zone: self.name.to_string(),
            setpoint: self.setpoint,
            temperature: self.temperature,
            demand_value,
        }
    }
}

/// Run one aggregation over the zones with valid demand.
///
/// With no zone demanding more than the fallback temperature there is no
/// minimum, nothing passes the cutoff and the result is `DEFAULT_TSET`.
pub fn aggregate(zones: &[ZoneDemand<'_>]) -> AggregationReport {
    let mut max: Option<&ZoneDemand<'_>> = None;
    let mut min: Option<&ZoneDemand<'_>> = None;
    let mut max_gap: Option<&ZoneDemand<'_>> = None;

    for z in zones {
        if max.is_none_or(|m| z.demand > m.demand) {
            max = Some(z);
        }
        if z.demand > FALLBACK_TSET && min.is_none_or(|m| z.demand < m.demand) {
            min = Some(z);
        }
        if max_gap.is_none_or(|m| z.gap() > m.gap()) {
            max_gap = Some(z);
        }
    }

    let tset = match (max, min) {
        (Some(hi), Some(lo)) => {
            let cutoff = lo.demand + CUTOFF_FRACTION * (hi.demand - lo.demand);
            let (sum, weight) = zones
                .iter()
                .filter(|z| z.demand >= cutoff)
                .fold((0.0, 0.0), |(s, w), z| (s + z.weight * z.demand.powi(3), w + z.weight));
            if weight > 0.0 {
                bound(((sum / weight).cbrt() * 2.0).round() / 2.0)
            } else {
                DEFAULT_TSET
            }
        }
        _ => DEFAULT_TSET,
    };

    AggregationReport {
        tset,
        ch_enable: tset >= MIN_ENABLE_TEMP,
        max: max.map(|z| z.record(z.demand)),
        min: min.map(|z| z.record(z.demand)),
        max_gap: max_gap.map(|z| z.record(z.gap())),
    }
}

impl AggregationReport {
    pub fn command(&self) -> BoilerCommand {
        BoilerCommand {
            tset: self.tset,
            ch_enable: self.ch_enable,
        }
    }
}

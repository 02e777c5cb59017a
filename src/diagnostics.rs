//! Per-run aggregation diagnostics.
//!
//! Every cross-zone aggregation produces an [`AggregationReport`] naming
//! the zones that drove it.  Adapters publish the records as JSON on
//! `<control>/maxcs`, `<control>/mincs` and `<control>/maxdiff`.

use serde::Serialize;

/// One zone's numbers at the time of an aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandRecord {
    pub zone: String,
    pub setpoint: f64,
    pub temperature: f64,
    /// Demand for max/min records; setpoint − temperature for the gap record.
    pub demand_value: f64,
}

impl DemandRecord {
    pub fn to_json(&self) -> String {
        // Plain struct of strings and finite floats; cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationReport {
    pub tset: f64,
    pub ch_enable: bool,
    /// Zone with the highest demand.
    pub max: Option<DemandRecord>,
    /// Zone with the lowest demand above the fallback temperature.
    pub min: Option<DemandRecord>,
    /// Zone furthest below its setpoint.
    pub max_gap: Option<DemandRecord>,
}

impl AggregationReport {
    /// `(topic suffix, record)` pairs present in this report.
    pub fn records(&self) -> impl Iterator<Item = (&'static str, &DemandRecord)> {
        [
            ("maxcs", self.max.as_ref()),
            ("mincs", self.min.as_ref()),
            ("maxdiff", self.max_gap.as_ref()),
        ]
        .into_iter()
        .filter_map(|(suffix, r)| r.map(|r| (suffix, r)))
    }
}

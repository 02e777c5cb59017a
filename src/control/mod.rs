//! Control law: per-zone thermal model and cross-zone aggregation.

pub mod aggregate;
pub mod thermal_model;

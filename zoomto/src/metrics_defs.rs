//! Metrics definitions for the zoomTo resolver.

use shared::metrics_defs::{MetricDef, MetricType};

pub const PROBE_SUCCESS: MetricDef = MetricDef {
    name: "zoomto.probe.success",
    metric_type: MetricType::Counter,
    description: "Dataset queries that contributed a feature",
};

pub const PROBE_FAILURE: MetricDef = MetricDef {
    name: "zoomto.probe.failure",
    metric_type: MetricType::Counter,
    description: "Dataset queries that were skipped. Tagged with reason.",
};

pub const FALLBACK: MetricDef = MetricDef {
    name: "zoomto.fallback",
    metric_type: MetricType::Counter,
    description: "zoomTo requests answered with the default extent",
};

pub const ALL_METRICS: &[MetricDef] = &[PROBE_SUCCESS, PROBE_FAILURE, FALLBACK];

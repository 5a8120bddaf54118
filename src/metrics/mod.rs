use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

// ============================================================================
// Metrics Module - Prometheus metrics for the event journal
// ============================================================================
//
// Tracks:
// - Appended events per aggregate type
// - Append conflicts (already exists / concurrency)
// - Schema validation failures
// - Journal query latency
//
// ============================================================================

pub struct JournalMetrics {
    registry: Registry,

    pub events_appended: IntCounterVec,
    pub append_conflicts: IntCounterVec,
    pub schema_validation_failures: IntCounterVec,
    pub query_duration: HistogramVec,
}

impl JournalMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_appended = IntCounterVec::new(
            Opts::new("journal_events_appended_total", "Total events appended to the journal"),
            &["aggregate_type"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let append_conflicts = IntCounterVec::new(
            Opts::new("journal_append_conflicts_total", "Appends rejected by the version constraint"),
            &["aggregate_type", "kind"],
        )?;
        registry.register(Box::new(append_conflicts.clone()))?;

        let schema_validation_failures = IntCounterVec::new(
            Opts::new(
                "journal_schema_validation_failures_total",
                "Events rejected because they did not match their schema",
            ),
            &["event_type"],
        )?;
        registry.register(Box::new(schema_validation_failures.clone()))?;

        let query_duration = HistogramVec::new(
            HistogramOpts::new("journal_query_duration_seconds", "Journal operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(query_duration.clone()))?;

        Ok(Self {
            registry,
            events_appended,
            append_conflicts,
            schema_validation_failures,
            query_duration,
        })
    }

    pub fn record_append(&self, aggregate_type: &str) {
        self.events_appended.with_label_values(&[aggregate_type]).inc();
    }

    /// `kind` is `already_exists` or `concurrency_conflict`.
    pub fn record_conflict(&self, aggregate_type: &str, kind: &str) {
        self.append_conflicts.with_label_values(&[aggregate_type, kind]).inc();
    }

    pub fn record_validation_failure(&self, event_type: &str) {
        self.schema_validation_failures.with_label_values(&[event_type]).inc();
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.query_duration.with_label_values(&[operation]).observe(duration_secs);
    }

    /// Prometheus text exposition of every metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub uploads_total: IntCounterVec,
    pub upload_latency_seconds: HistogramVec,
    pub upload_bytes_total: IntCounter,
    pub rounds_scored_total: IntCounter,
    pub round_score: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let uploads_total = IntCounterVec::new(
            Opts::new("uploads_total", "Photo uploads by outcome"),
            &["outcome"],
        )
        .expect("valid uploads_total metric");

        let upload_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "upload_latency_seconds",
                "Latency of a full create/upload/finalize run in seconds",
            ),
            &["outcome"],
        )
        .expect("valid upload_latency_seconds metric");

        let upload_bytes_total = IntCounter::new(
            "upload_bytes_total",
            "Image bytes successfully uploaded",
        )
        .expect("valid upload_bytes_total metric");

        let rounds_scored_total = IntCounter::new("rounds_scored_total", "Rounds scored")
            .expect("valid rounds_scored_total metric");

        let round_score = Histogram::with_opts(
            HistogramOpts::new("round_score", "Distribution of round scores").buckets(vec![
                0.0, 500.0, 1_000.0, 2_000.0, 3_000.0, 4_000.0, 4_500.0, 4_900.0, 5_000.0,
            ]),
        )
        .expect("valid round_score metric");

        registry
            .register(Box::new(uploads_total.clone()))
            .expect("register uploads_total");
        registry
            .register(Box::new(upload_latency_seconds.clone()))
            .expect("register upload_latency_seconds");
        registry
            .register(Box::new(upload_bytes_total.clone()))
            .expect("register upload_bytes_total");
        registry
            .register(Box::new(rounds_scored_total.clone()))
            .expect("register rounds_scored_total");
        registry
            .register(Box::new(round_score.clone()))
            .expect("register round_score");

        Self {
            registry,
            uploads_total,
            upload_latency_seconds,
            upload_bytes_total,
            rounds_scored_total,
            round_score,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

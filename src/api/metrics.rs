use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

/// Service metrics, kept in a registry owned by the running app.
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    render_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("pdf_generate_requests_total", "PDF generation requests by outcome"),
            &["outcome"],
        )?;
        let render_seconds = Histogram::with_opts(
            HistogramOpts::new("pdf_generate_duration_seconds", "Time to produce a PDF")
                .buckets(vec![0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(render_seconds.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Metrics {
            registry,
            requests,
            render_seconds,
        })
    }

    /// `outcome` is `success` or the failing stage.
    pub fn record(&self, outcome: &str, seconds: f64) {
        self.requests.with_label_values(&[outcome]).inc();
        if outcome == "success" {
            self.render_seconds.observe(seconds);
        }
    }

    pub fn request_count(&self, outcome: &str) -> u64 {
        self.requests.with_label_values(&[outcome]).get()
    }

    pub fn encode(&self) -> prometheus::Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters of what the pump did with each captured frame.
pub struct Metrics {
    registry: Registry,
    injected: IntCounter,
    skipped: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let injected = IntCounter::new("rst_injected_total", "forged rst packets written")?;
        let skipped = IntCounterVec::new(
            Opts::new("frames_skipped_total", "captured frames that were not forged"),
            &["reason"],
        )?;
        registry.register(Box::new(injected.clone()))?;
        registry.register(Box::new(skipped.clone()))?;

        Ok(Self {
            registry,
            injected,
            skipped,
        })
    }

    pub fn inc_injected(&self) {
        self.injected.inc();
    }

    pub fn inc_skipped(&self, reason: &str) {
        self.skipped.with_label_values(&[reason]).inc();
    }

    pub fn injected(&self) -> u64 {
        self.injected.get()
    }

    pub fn skipped(&self, reason: &str) -> u64 {
        self.skipped.with_label_values(&[reason]).get()
    }

    pub fn export(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

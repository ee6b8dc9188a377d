use chrono::{DateTime, Utc};

/// Running usage/quality statistics attached to a stored prompt.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct MetricsRecord {
    /// Number of times this prompt has been retrieved or reused.
    pub usage_count: u64,
    /// Last time this prompt was retrieved or reused.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Running average latency, in milliseconds, of the phase call that
    /// produced this prompt.
    pub avg_latency_ms: f64,
    /// Count of successful downstream uses.
    pub success_count: u64,
    /// Count of failed downstream uses.
    pub failure_count: u64,
}

impl Default for MetricsRecord {
    fn default() -> Self {
        Self {
            usage_count: 0,
            last_used_at: None,
            avg_latency_ms: 0.0,
            success_count: 0,
            failure_count: 0,
        }
    }
}

impl MetricsRecord {
    /// Records a new usage, updating the running average latency and
    /// bumping the usage/outcome counters.
    pub fn record_use(&mut self, latency_ms: f64, success: bool) {
        let n = self.usage_count as f64;
        self.avg_latency_ms = (self.avg_latency_ms * n + latency_ms) / (n + 1.0);
        self.usage_count += 1;
        self.last_used_at = Some(Utc::now());
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
    }

    /// Fraction of uses that succeeded, or `1.0` if never used.
    pub fn success_rate(&self) -> f64 {
        if self.usage_count == 0 {
            return 1.0;
        }
        self.success_count as f64 / self.usage_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_use_updates_running_average() {
        let mut m = MetricsRecord::default();
        m.record_use(100.0, true);
        m.record_use(200.0, true);
        assert_eq!(m.usage_count, 2);
        assert!((m.avg_latency_ms - 150.0).abs() < 1e-9);
    }

    #[test]
    fn success_rate_defaults_to_one_when_unused() {
        let m = MetricsRecord::default();
        assert_eq!(m.success_rate(), 1.0);
    }

    #[test]
    fn success_rate_reflects_failures() {
        let mut m = MetricsRecord::default();
        m.record_use(10.0, true);
        m.record_use(10.0, false);
        assert_eq!(m.success_rate(), 0.5);
    }
}

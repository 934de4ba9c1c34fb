use std::time::Duration;

/// Acquisition behaviour of a [`TekScope`](crate::TekScope) session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Pause after leaving hardware averaging mode before the first transfer.
    pub mode_settle_delay: Duration,
    /// Upper bound on the rounded repetition count accepted by `average`.
    pub max_averages: u32,
}

impl ScopeConfig {
    pub const DEFAULT_MODE_SETTLE_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_MAX_AVERAGES: u32 = 1024;

    pub fn with_mode_settle_delay(mut self, delay: Duration) -> Self {
        self.mode_settle_delay = delay;
        self
    }

    pub fn with_max_averages(mut self, max_averages: u32) -> Self {
        self.max_averages = max_averages;
        self
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            mode_settle_delay: Self::DEFAULT_MODE_SETTLE_DELAY,
            max_averages: Self::DEFAULT_MAX_AVERAGES,
        }
    }
}

/// Line settings for [`SerialChannel`](crate::SerialChannel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    /// How long a single reply may take before the read fails.
    pub timeout: Duration,
}

impl SerialSettings {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_secs(2),
        }
    }
}

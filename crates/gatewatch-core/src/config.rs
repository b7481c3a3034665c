// ── Runtime configuration ──
//
// Tuning the core needs at runtime. Never touches disk: the host builds a
// `CoreConfig` (see `gatewatch-config`) and hands it in.

use std::time::Duration;

/// Default time an action label stays visible before it resets.
pub const DEFAULT_PULSE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// How long a decoded action label stays published before the reset.
    pub pulse_delay: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pulse_delay: DEFAULT_PULSE_DELAY,
        }
    }
}

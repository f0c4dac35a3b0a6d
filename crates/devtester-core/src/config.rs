// ── Runtime orchestration configuration ──
//
// Timing knobs for the simulated round-trips. Built by the CLI (or a
// test) and handed to the orchestrator -- core never reads config files.

use std::time::Duration;

/// Delays applied by the orchestrator's simulated operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Simulated round-trip for a single-device authentication.
    pub authenticate_delay: Duration,
    /// Single delay shared by the whole bulk authentication batch.
    pub authenticate_all_delay: Duration,
    /// Delay before the static payload is requested.
    pub static_fetch_delay: Duration,
    /// Delay before the one-shot dynamic payload is requested.
    pub dynamic_fetch_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            authenticate_delay: Duration::from_millis(500),
            authenticate_all_delay: Duration::from_millis(2000),
            static_fetch_delay: Duration::from_millis(2000),
            dynamic_fetch_delay: Duration::from_millis(1000),
        }
    }
}

impl OrchestratorConfig {
    /// A configuration with every delay set to zero.
    pub fn immediate() -> Self {
        Self {
            authenticate_delay: Duration::ZERO,
            authenticate_all_delay: Duration::ZERO,
            static_fetch_delay: Duration::ZERO,
            dynamic_fetch_delay: Duration::ZERO,
        }
    }
}

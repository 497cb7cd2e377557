//! Logging setup and the recoverable-error channel.

use serde::{Deserialize, Serialize};

/// Accumulates recoverable configuration errors as rendered text. Nothing
/// in the query layer throws across an evaluation; problems land here (or
/// on the owning module) and the orchestrator decides before launch whether
/// the run may proceed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorLog {
    entries: Vec<String>,
}

impl ErrorLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one error and logs it.
    pub fn record(&mut self, message: String) {
        tracing::warn!(error = %message, "Configuration error");
        self.entries.push(message);
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Initialize tracing subscriber for logging.
pub fn init_logging() {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    )
    .ok();
}

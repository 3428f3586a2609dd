//! Diagnostic sink the execution wrapper reports statements to.

/// Receiver of per-statement diagnostics.
///
/// The wrapper calls `info` for every executed statement when logging or
/// timing is enabled, and `error` for every failed statement regardless of
/// those flags. `fatal` is reserved for conditions the caller cannot
/// continue from (a connection that cannot be opened).
pub trait DiagnosticSink: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
    fn fatal(&self, message: &str);
}

/// Default sink forwarding to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "orma::sql", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "orma::sql", "{message}");
    }

    fn fatal(&self, message: &str) {
        tracing::error!(target: "orma::sql", fatal = true, "{message}");
    }
}

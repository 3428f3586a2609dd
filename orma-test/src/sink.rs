use std::sync::{Mutex, PoisonError};

use orma_data::DiagnosticSink;

/// [`DiagnosticSink`] keeping every message for later assertions.
///
/// ```ignore
/// let sink = Arc::new(CapturingSink::new());
/// let mut db = Database::new(driver).with_sink(sink.clone());
/// // ...
/// assert!(sink.errors()[0].contains("widget::insert"));
/// ```
#[derive(Debug, Default)]
pub struct CapturingSink {
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    fatals: Mutex<Vec<String>>,
}

fn snapshot(messages: &Mutex<Vec<String>>) -> Vec<String> {
    messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn record(messages: &Mutex<Vec<String>>, message: &str) {
    messages
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(message.to_string());
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn infos(&self) -> Vec<String> {
        snapshot(&self.infos)
    }

    pub fn errors(&self) -> Vec<String> {
        snapshot(&self.errors)
    }

    pub fn fatals(&self) -> Vec<String> {
        snapshot(&self.fatals)
    }
}

impl DiagnosticSink for CapturingSink {
    fn info(&self, message: &str) {
        record(&self.infos, message);
    }

    fn error(&self, message: &str) {
        record(&self.errors, message);
    }

    fn fatal(&self, message: &str) {
        record(&self.fatals, message);
    }
}

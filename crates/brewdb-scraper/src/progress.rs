//! Per-source progress signal.
//!
//! Adapters report each product they finish processing (kept or dropped).
//! The sink decides how to render it; the CLI draws progress bars.

use std::collections::HashMap;
use std::sync::Mutex;

use brewdb_core::SourceId;

pub trait ProgressSink: Send + Sync {
    /// Called once before the first page of `source` is requested.
    fn started(&self, _source: SourceId) {}

    /// `processed` is the running count for `source` and never decreases.
    fn advanced(&self, source: SourceId, processed: u64);

    /// Called once when `source` has returned.
    fn finished(&self, _source: SourceId, _processed: u64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn advanced(&self, _source: SourceId, _processed: u64) {}
}

/// Keeps the highest reported count per source.
#[derive(Debug, Default)]
pub struct CountingProgress {
    counts: Mutex<HashMap<SourceId, u64>>,
}

impl CountingProgress {
    #[must_use]
    pub fn count(&self, source: SourceId) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.get(&source).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl ProgressSink for CountingProgress {
    fn advanced(&self, source: SourceId, processed: u64) {
        if let Ok(mut counts) = self.counts.lock() {
            let entry = counts.entry(source).or_insert(0);
            *entry = (*entry).max(processed);
        }
    }
}

/// Running per-source counter that forwards each increment to a sink.
pub(crate) struct Tally<'a> {
    source: SourceId,
    sink: &'a dyn ProgressSink,
    processed: u64,
}

impl<'a> Tally<'a> {
    pub(crate) fn new(source: SourceId, sink: &'a dyn ProgressSink) -> Self {
        sink.started(source);
        Self {
            source,
            sink,
            processed: 0,
        }
    }

    pub(crate) fn bump(&mut self) {
        self.processed += 1;
        self.sink.advanced(self.source, self.processed);
    }

    pub(crate) fn finish(self) -> u64 {
        self.sink.finished(self.source, self.processed);
        self.processed
    }
}

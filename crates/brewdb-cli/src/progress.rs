//! Terminal progress bars: one spinner line per source.
//!
//! Console logging shares the bars' [`MultiProgress`] through [`BarWriter`],
//! so log lines print above the spinners instead of through them.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::fmt::MakeWriter;

use brewdb_core::SourceId;
use brewdb_scraper::ProgressSink;

const TEMPLATE: &str = "{spinner:.cyan} {prefix:<18.bold} {pos:>6} products  {elapsed:>4}  {msg}";

pub(crate) struct BarProgress {
    bars: HashMap<SourceId, ProgressBar>,
}

impl BarProgress {
    pub(crate) fn new(multi: &MultiProgress, sources: &[SourceId]) -> Self {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bars = sources
            .iter()
            .map(|&source| {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(style.clone());
                bar.set_prefix(source.as_str());
                bar.set_message("waiting");
                (source, bar)
            })
            .collect();

        Self { bars }
    }

    /// Stops the bar for `source` and leaves `status` as its final message.
    pub(crate) fn settle(&self, source: SourceId, status: &str) {
        if let Some(bar) = self.bars.get(&source) {
            bar.finish_with_message(status.to_owned());
        }
    }
}

impl ProgressSink for BarProgress {
    fn started(&self, source: SourceId) {
        if let Some(bar) = self.bars.get(&source) {
            bar.set_message("running");
            bar.enable_steady_tick(Duration::from_millis(120));
        }
    }

    fn advanced(&self, source: SourceId, processed: u64) {
        if let Some(bar) = self.bars.get(&source) {
            bar.set_position(processed);
        }
    }

    fn finished(&self, source: SourceId, processed: u64) {
        if let Some(bar) = self.bars.get(&source) {
            bar.set_position(processed);
            bar.disable_steady_tick();
            bar.set_message("done");
        }
    }
}

/// Stderr writer for the console log layer. Each write hides the bars,
/// prints, then redraws them.
#[derive(Clone)]
pub(crate) struct BarWriter {
    multi: MultiProgress,
}

impl BarWriter {
    pub(crate) fn new(multi: &MultiProgress) -> Self {
        Self {
            multi: multi.clone(),
        }
    }
}

impl<'a> MakeWriter<'a> for BarWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for BarWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.multi.suspend(|| io::stderr().flush())
    }
}

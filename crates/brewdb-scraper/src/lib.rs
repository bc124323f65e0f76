pub mod aggregate;
pub mod browser;
pub mod error;
pub mod normalize;
pub mod pagination;
pub mod parse;
pub mod progress;
pub mod retry;
pub mod sources;
pub mod transport;
pub mod types;

pub use aggregate::{merge, Aggregator, RunReport, SourceStatus, SourceSummary};
pub use browser::{BrowserLauncher, BrowserSession, ChromiumLauncher, ChromiumOptions};
pub use error::{AttemptError, ScraperError};
pub use normalize::normalize;
pub use progress::{CountingProgress, NoopProgress, ProgressSink};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use sources::{build_adapter, AdapterSettings, Harvest, RunContext, SourceAdapter};
pub use transport::{FetchTarget, HttpRequest, Transport};
pub use types::RawItem;

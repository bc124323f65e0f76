use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub sources_path: PathBuf,
    pub output_path: PathBuf,
    pub request_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub user_agent: String,
    pub max_attempts: u32,
    pub retry_base_delay_secs: u64,
    /// Upper bound of the random extra wait added to each backoff; 0 disables it.
    pub retry_jitter_ms: u64,
    pub max_pages: usize,
    pub page_size: u32,
    pub detail_concurrency: usize,
    pub page_settle_ms: u64,
    /// `None` disables the global run timeout.
    pub run_timeout_secs: Option<u64>,
    pub concurrent_sources: bool,
    pub chromium_path: Option<PathBuf>,
}

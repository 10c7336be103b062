// Server configuration
// Decision: clap derive with an environment variable behind every flag
// Decision: Invalid combinations fail startup instead of being silently corrected

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use printworks_core::{ChromiumConfig, RenderSettings};
use printworks_pool::PoolConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "printworks-server")]
#[command(about = "Printworks - HTML to PDF over a pool of headless Chromium workers")]
#[command(version)]
pub struct ServerConfig {
    /// Accepted bearer keys, comma separated (empty disables auth)
    #[arg(short = 'k', long, env = "PRINTWORKS_KEYS", value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Address to bind
    #[arg(long, env = "PRINTWORKS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PRINTWORKS_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Maximum number of Chromium workers
    #[arg(short, long, env = "PRINTWORKS_THREADS", default_value_t = 5)]
    pub threads: usize,

    /// Chromium executable
    #[arg(long, env = "PRINTWORKS_CHROMIUM", default_value = printworks_core::chromium::DEFAULT_CHROMIUM_PATH)]
    pub chromium: PathBuf,

    /// How long a job may wait for a worker
    #[arg(long, env = "PRINTWORKS_ACQUIRE_TIMEOUT_MS", default_value_t = 120_000)]
    pub acquire_timeout_ms: u64,

    /// Number of job priority levels
    #[arg(long, env = "PRINTWORKS_PRIORITY_LEVELS", default_value_t = 3)]
    pub priority_levels: u32,

    /// Bound on loading content until the page is ready
    #[arg(long, env = "PRINTWORKS_READY_TIMEOUT_MS", default_value_t = 30_000)]
    pub ready_timeout_ms: u64,

    /// Default bound on PDF export
    #[arg(long, env = "PRINTWORKS_RENDER_TIMEOUT_MS", default_value_t = 30_000)]
    pub render_timeout_ms: u64,

    /// How long shutdown waits for in-flight jobs
    #[arg(long, env = "PRINTWORKS_DRAIN_TIMEOUT_MS", default_value_t = 30_000)]
    pub drain_timeout_ms: u64,

    /// Retire a worker after this many jobs
    #[arg(long, env = "PRINTWORKS_MAX_WORKER_USES")]
    pub max_worker_uses: Option<u32>,

    /// Retire a worker once it is this old
    #[arg(long, env = "PRINTWORKS_MAX_WORKER_AGE_SECS")]
    pub max_worker_age_secs: Option<u64>,

    /// Root for per-worker profile directories (default: $TMPDIR/printworks)
    #[arg(long, env = "PRINTWORKS_TMP_DIR")]
    pub tmp_dir: Option<PathBuf>,

    /// Prefix for the job API, e.g. "/api"
    #[arg(long, env = "API_PREFIX", default_value = "")]
    pub api_prefix: String,
}

impl ServerConfig {
    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            bail!("--threads must be at least 1");
        }
        if self.priority_levels == 0 {
            bail!("--priority-levels must be at least 1");
        }
        if self.acquire_timeout_ms == 0 {
            bail!("--acquire-timeout-ms must be greater than zero");
        }
        if self.ready_timeout_ms == 0 || self.render_timeout_ms == 0 {
            bail!("--ready-timeout-ms and --render-timeout-ms must be greater than zero");
        }
        if self.max_worker_uses == Some(0) {
            bail!("--max-worker-uses must be at least 1 when set");
        }
        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            bail!("--api-prefix must start with '/' (got {:?})", self.api_prefix);
        }
        self.pool_config().map(|_| ())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pool_config(&self) -> Result<PoolConfig> {
        let mut config = PoolConfig::default()
            .with_max_workers(self.threads)
            .with_acquire_timeout(Duration::from_millis(self.acquire_timeout_ms))
            .with_priority_levels(self.priority_levels)
            .with_drain_timeout(Duration::from_millis(self.drain_timeout_ms));
        if let Some(uses) = self.max_worker_uses {
            config = config.with_max_worker_uses(uses);
        }
        if let Some(secs) = self.max_worker_age_secs {
            config = config.with_max_worker_age(Duration::from_secs(secs));
        }
        config.validate().context("Invalid pool configuration")?;
        Ok(config)
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings::default()
            .with_ready_timeout(Duration::from_millis(self.ready_timeout_ms))
            .with_export_timeout(Duration::from_millis(self.render_timeout_ms))
    }

    pub fn chromium_config(&self) -> ChromiumConfig {
        let config = ChromiumConfig::default().with_executable(self.chromium.clone());
        match &self.tmp_dir {
            Some(dir) => config.with_tmp_dir(dir.clone()),
            None => config,
        }
    }
}

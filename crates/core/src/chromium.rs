//! Headless Chromium engine
//!
//! One pooled worker owns one Chromium process, driven over the DevTools
//! protocol with `chromiumoxide`. Each job gets its own page, which is the
//! render context; the browser process survives across jobs.
//!
//! ```text
//! ChromiumLauncher::create ─► Browser::launch ─► handler task
//!          │
//!          ▼
//!   ChromiumBrowser ──open_context──► ChromiumPage (about:blank)
//!          │                             set_content ─► poll ready ─► printToPDF ─► close
//!          ▼
//! ChromiumLauncher::destroy ─► close + wait ─► remove user data dir
//! ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use printworks_pool::{FactoryError, WorkerFactory, WorkerId};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::artifact::EngineOutput;
use crate::engine::{RenderContext, RenderEngine};
use crate::error::EngineError;
use crate::options::RenderOptions;

/// Default browser executable
pub const DEFAULT_CHROMIUM_PATH: &str = "/usr/bin/chromium";

/// Flags every worker browser is launched with
const CHROMIUM_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
    "--single-process",
    "--ignore-certificate-errors",
    "--disable-application-cache",
    "--disk-cache-size=1",
    "--media-cache-size=1",
    "--aggressive-cache-discard",
];

const READY_CHECK: &str = "document.readyState === 'complete' \
    && (!document.fonts || document.fonts.status === 'loaded')";

/// Chromium launch settings
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Browser executable
    pub executable: PathBuf,
    /// Parent of per-worker profile and cache directories
    pub tmp_dir: PathBuf,
    pub window_width: u32,
    pub window_height: u32,
    /// Bound on the browser process start
    pub launch_timeout: Duration,
    /// Interval between readiness checks
    pub ready_poll_interval: Duration,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_CHROMIUM_PATH),
            tmp_dir: std::env::temp_dir().join("printworks"),
            window_width: 1920,
            window_height: 1080,
            launch_timeout: Duration::from_secs(20),
            ready_poll_interval: Duration::from_millis(50),
        }
    }
}

impl ChromiumConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `PRINTWORKS_CHROMIUM`: browser executable (default: "/usr/bin/chromium")
    /// - `PRINTWORKS_TMP_DIR`: profile directory root (default: "$TMPDIR/printworks")
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("PRINTWORKS_CHROMIUM") {
            config.executable = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("PRINTWORKS_TMP_DIR") {
            config.tmp_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = path.into();
        self
    }

    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = dir.into();
        self
    }

    fn profile_dir(&self, id: WorkerId) -> PathBuf {
        self.tmp_dir.join(format!("worker-{}", id))
    }
}

/// Launches one Chromium process per pooled worker
pub struct ChromiumLauncher {
    config: ChromiumConfig,
}

impl ChromiumLauncher {
    pub fn new(config: ChromiumConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChromiumConfig {
        &self.config
    }

    fn browser_config(&self, profile_dir: &std::path::Path) -> Result<BrowserConfig, String> {
        let cache_dir = profile_dir.join("cache");

        BrowserConfig::builder()
            .chrome_executable(&self.config.executable)
            .user_data_dir(profile_dir)
            .window_size(self.config.window_width, self.config.window_height)
            .viewport(Viewport {
                width: self.config.window_width,
                height: self.config.window_height,
                ..Default::default()
            })
            .launch_timeout(self.config.launch_timeout)
            .args(CHROMIUM_ARGS.iter().copied())
            .arg(format!("--disk-cache-dir={}", cache_dir.display()))
            .build()
    }
}

#[async_trait]
impl WorkerFactory for ChromiumLauncher {
    type Instance = ChromiumBrowser;

    async fn create(&self, id: WorkerId) -> Result<ChromiumBrowser, FactoryError> {
        let profile_dir = self.config.profile_dir(id);
        tokio::fs::create_dir_all(&profile_dir).await.map_err(|e| {
            FactoryError::Launch(format!(
                "failed to create profile dir {}: {}",
                profile_dir.display(),
                e
            ))
        })?;

        let launched = match self.browser_config(&profile_dir) {
            Ok(config) => Browser::launch(config).await.map_err(|e| e.to_string()),
            Err(e) => Err(e),
        };
        let (browser, mut handler) = match launched {
            Ok(launched) => launched,
            Err(e) => {
                remove_profile(&profile_dir).await;
                return Err(FactoryError::Launch(e));
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(worker_id = %id, error = %e, "DevTools handler error");
                }
            }
        });

        info!(
            worker_id = %id,
            executable = %self.config.executable.display(),
            "Chromium launched"
        );

        Ok(ChromiumBrowser {
            browser,
            handler: handler_task,
            profile_dir,
            ready_poll_interval: self.config.ready_poll_interval,
        })
    }

    async fn destroy(&self, id: WorkerId, instance: ChromiumBrowser) -> Result<(), FactoryError> {
        let ChromiumBrowser {
            mut browser,
            handler,
            profile_dir,
            ..
        } = instance;

        let closed = browser.close().await.map(|_| ());
        if let Err(e) = browser.wait().await {
            warn!(worker_id = %id, error = %e, "Failed waiting for Chromium to exit");
        }
        handler.abort();
        remove_profile(&profile_dir).await;

        debug!(worker_id = %id, "Chromium stopped");
        closed.map_err(|e| FactoryError::Shutdown(e.to_string()))
    }
}

async fn remove_profile(dir: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %dir.display(), error = %e, "Failed to remove Chromium profile dir");
        }
    }
}

/// A running Chromium process owned by one worker
pub struct ChromiumBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
    ready_poll_interval: Duration,
}

#[async_trait]
impl RenderEngine for ChromiumBrowser {
    type Context = ChromiumPage;

    async fn open_context(&self) -> Result<ChromiumPage, EngineError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::OpenContext(e.to_string()))?;

        Ok(ChromiumPage {
            page: Some(page),
            ready_poll_interval: self.ready_poll_interval,
        })
    }
}

/// One job's page
pub struct ChromiumPage {
    page: Option<Page>,
    ready_poll_interval: Duration,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, EngineError> {
        self.page
            .as_ref()
            .ok_or_else(|| EngineError::OpenContext("page already closed".into()))
    }
}

#[async_trait]
impl RenderContext for ChromiumPage {
    async fn load(&mut self, content: &str) -> Result<(), EngineError> {
        self.page()?
            .set_content(content)
            .await
            .map_err(|e| EngineError::Load(e.to_string()))?;
        Ok(())
    }

    async fn wait_until_ready(&mut self) -> Result<(), EngineError> {
        let page = self.page()?;
        loop {
            let ready: bool = page
                .evaluate(READY_CHECK)
                .await
                .map_err(|e| EngineError::Load(e.to_string()))?
                .into_value()
                .map_err(|e| EngineError::Load(format!("unexpected readiness value: {}", e)))?;
            if ready {
                return Ok(());
            }
            tokio::time::sleep(self.ready_poll_interval).await;
        }
    }

    async fn export(&mut self, options: &RenderOptions) -> Result<EngineOutput, EngineError> {
        let pdf = self
            .page()?
            .pdf(print_params(options))
            .await
            .map_err(|e| EngineError::Export(e.to_string()))?;
        Ok(EngineOutput::Bytes(pdf))
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        match self.page.take() {
            Some(page) => page
                .close()
                .await
                .map_err(|e| EngineError::Close(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Translate render options into a `Page.printToPDF` request
pub fn print_params(options: &RenderOptions) -> PrintToPdfParams {
    let (paper_width, paper_height) = options.paper_size();
    let margin = &options.margin;

    PrintToPdfParams {
        landscape: Some(options.landscape),
        display_header_footer: Some(options.display_header_footer),
        print_background: Some(options.print_background),
        scale: options.scale,
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: margin.top.map(|m| m.inches()),
        margin_bottom: margin.bottom.map(|m| m.inches()),
        margin_left: margin.left.map(|m| m.inches()),
        margin_right: margin.right.map(|m| m.inches()),
        page_ranges: options.page_ranges.clone(),
        header_template: options.header_template.clone(),
        footer_template: options.footer_template.clone(),
        prefer_css_page_size: Some(options.prefer_css_page_size),
        ..Default::default()
    }
}

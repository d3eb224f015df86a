// src/feeds/render.rs
use std::ffi::OsStr;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use tracing::debug;

use crate::error::IngestError;

/// Renders a URL to HTML. The extraction algorithm depends only on this
/// seam, so it runs against canned HTML in tests without a browser.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, IngestError>;
}

/// News sites serve degraded or blocked pages to obvious automation, so
/// the renderer presents a desktop browser.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Headless Chrome renderer. One browser session per call; the session and
/// its temporary profile directory are dropped when the call returns, on
/// success and failure alike, so no cookies or fingerprints leak between
/// entries.
pub struct ChromeRenderer {
    user_agent: String,
}

impl ChromeRenderer {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    fn render_blocking(
        user_agent: &str,
        url: &str,
        timeout: Duration,
    ) -> Result<String, IngestError> {
        let profile = tempfile::TempDir::new()
            .map_err(|e| IngestError::Transient(format!("browser profile dir: {e}")))?;

        let options = LaunchOptions::default_builder()
            .headless(true)
            .user_data_dir(Some(profile.path().to_path_buf()))
            .args(vec![
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--no-first-run"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--mute-audio"),
            ])
            .idle_browser_timeout(timeout + Duration::from_secs(5))
            .build()
            .map_err(|e| IngestError::Transient(format!("browser launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| IngestError::Transient(format!("browser launch: {e:#}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| IngestError::Transient(format!("browser tab: {e:#}")))?;
        tab.set_user_agent(user_agent, None, None)
            .map_err(|e| IngestError::Transient(format!("user agent override: {e:#}")))?;
        tab.set_default_timeout(timeout);
        tab.navigate_to(url)
            .map_err(|e| IngestError::Transient(format!("navigate: {e:#}")))?;
        tab.wait_until_navigated()
            .map_err(|e| IngestError::Transient(format!("page load: {e:#}")))?;
        let html = tab
            .get_content()
            .map_err(|e| IngestError::Transient(format!("page content: {e:#}")))?;

        debug!(%url, bytes = html.len(), "page rendered");
        Ok(html)
        // `browser` and `profile` drop here on every path, killing the
        // Chrome process and removing the profile directory.
    }
}

impl Default for ChromeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String, IngestError> {
        let user_agent = self.user_agent.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || Self::render_blocking(&user_agent, &url, timeout))
            .await
            .map_err(|e| IngestError::Transient(format!("render task: {e}")))?
    }
}

//! Browser capability.
//!
//! Only the no-op backend lives here; sessions that need a real browser plug
//! their own [`Browser`] into the environment.

use anyhow::Result;
use async_trait::async_trait;

use crate::core::types::BrowserTab;

#[async_trait]
pub trait Browser: Send + Sync {
    /// Open tabs in display order.
    async fn get_browser_state(&self) -> Result<Vec<BrowserTab>>;

    /// Navigate tab `tab_index` to `url`, or a new tab when `None`.
    ///
    /// The returned text is backend-defined (page content or a tab id).
    async fn open_url(&self, url: &str, tab_index: Option<usize>) -> Result<String>;
}

/// Browser with no tabs that ignores navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyBrowser;

#[async_trait]
impl Browser for DummyBrowser {
    async fn get_browser_state(&self) -> Result<Vec<BrowserTab>> {
        Ok(Vec::new())
    }

    async fn open_url(&self, _url: &str, _tab_index: Option<usize>) -> Result<String> {
        Ok(String::new())
    }
}

use crate::parser::types::Locator;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Driver-agnostic browser interface
///
/// This trait defines the capability set the runner depends on: page
/// navigation, visibility queries, click/fill dispatch, and page state
/// retrieval. The runner never talks to a concrete automation library
/// directly.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Short identifier for logs and reports (e.g. "chromium")
    fn session_name(&self) -> String;

    /// Navigate the active page and wait for the load to settle.
    /// Relative paths are resolved against the configured base URL.
    async fn goto(&self, url: &str) -> Result<()>;

    /// Current document URL
    async fn current_url(&self) -> Result<String>;

    /// Whether a locator currently matches a visible element.
    /// Read-only; absence is reported as `Ok(false)`, not an error.
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    /// Click the first element matching the locator
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Fill the first element matching the locator with a value
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    /// The page's visible text content
    async fn visible_text(&self) -> Result<String>;

    /// Save a screenshot of the current page
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Release the underlying browser session. Must be safe to call on
    /// every exit path, including after a driver fault.
    async fn close(&self) -> Result<()>;
}

/// Creates browser sessions for the orchestrator: one per suite in the
/// serial path, one per isolated group in the parallel path, and a
/// replacement whenever a session is recycled after a driver fault.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn BrowserDriver>>;
}

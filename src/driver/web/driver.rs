//! Web driver implementation using Playwright
//!
//! Maps the runner's locators onto Playwright selector engines and keeps
//! all browser-specific plumbing behind the `BrowserDriver` trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::driver::traits::{BrowserDriver, SessionFactory};
use crate::parser::types::Locator;

/// Web browser type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "firefox" => BrowserType::Firefox,
            "webkit" => BrowserType::Webkit,
            _ => BrowserType::Chromium,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }
}

/// Web driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    pub base_url: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        let headless = std::env::var("SHOPCHECK_HEADLESS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            browser_type: BrowserType::Chromium,
            headless,
            base_url: None,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Browser session backed by Playwright
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    #[allow(dead_code)]
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
}

impl WebDriver {
    pub async fn new(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match config.browser_type {
            BrowserType::Chromium => {
                playwright
                    .chromium()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserType::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
            BrowserType::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .launch()
                    .await?
            }
        };

        let context = browser.context_builder().build().await?;
        let page = context.new_page().await?;

        page.set_viewport_size(Viewport {
            width: config.viewport_width as i32,
            height: config.viewport_height as i32,
        })
        .await?;

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
        })
    }

    /// Convert a locator to a Playwright selector string
    fn locator_to_playwright(locator: &Locator) -> String {
        match locator {
            Locator::Css(css) => css.clone(),
            Locator::Text(text) => format!("text=\"{}\"", text),
            Locator::TextPattern(pattern) => {
                if pattern.starts_with('/') {
                    format!("text={}", pattern)
                } else {
                    format!("text=/{}/i", regex::escape(pattern))
                }
            }
            Locator::Placeholder(p) => format!("[placeholder=\"{}\"]", p),
            Locator::Role(role) => format!("[role=\"{}\"]", role),
        }
    }

    fn full_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if let Some(ref base) = self.config.base_url {
            format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
        } else {
            url.to_string()
        }
    }
}

#[async_trait]
impl BrowserDriver for WebDriver {
    fn session_name(&self) -> String {
        self.config.browser_type.name().to_string()
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        let full_url = self.full_url(url);

        log::debug!("navigating to {}", full_url);
        page.goto_builder(&full_url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", full_url))?;

        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let page = self.page.lock().await;
        let url: String = page.evaluate("() => window.location.href", ()).await?;
        Ok(url)
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let page = self.page.lock().await;
        let sel = Self::locator_to_playwright(locator);
        let element = page.query_selector(&sel).await?;
        if let Some(el) = element {
            Ok(el.is_visible().await?)
        } else {
            Ok(false)
        }
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let page = self.page.lock().await;
        let sel = Self::locator_to_playwright(locator);
        page.click_builder(&sel)
            .click()
            .await
            .with_context(|| format!("Failed to click: {}", sel))?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let page = self.page.lock().await;
        let sel = Self::locator_to_playwright(locator);
        let element = page
            .query_selector(&sel)
            .await?
            .with_context(|| format!("Element disappeared before fill: {}", sel))?;
        element.fill_builder(value).fill().await?;
        Ok(())
    }

    async fn visible_text(&self) -> Result<String> {
        let page = self.page.lock().await;
        let text: String = page
            .evaluate("() => document.body ? document.body.innerText : ''", ())
            .await?;
        Ok(text)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let page = self.page.lock().await;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        page.screenshot_builder()
            .path(path.to_path_buf())
            .screenshot()
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Creates Playwright sessions from a shared configuration
pub struct WebSessionFactory {
    config: WebDriverConfig,
}

impl WebSessionFactory {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for WebSessionFactory {
    async fn create(&self) -> Result<Box<dyn BrowserDriver>> {
        let driver = WebDriver::new(self.config.clone()).await?;
        Ok(Box::new(driver))
    }
}

//! Scripted in-memory driver for runner tests
//!
//! Pages are keyed by URL and expose a set of visible locators (in their
//! compact string form) plus a body text. Click effects let a test script
//! page transitions and revealed feedback without a browser.

use crate::driver::traits::{BrowserDriver, SessionFactory};
use crate::parser::types::Locator;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub visible: Vec<String>,
    pub text: String,
}

impl MockPage {
    pub fn new(visible: &[&str], text: &str) -> Self {
        Self {
            visible: visible.iter().map(|s| s.to_string()).collect(),
            text: text.to_string(),
        }
    }
}

/// What happens when a scripted locator is clicked
#[derive(Debug, Clone, Default)]
pub struct ClickEffect {
    pub goto: Option<String>,
    pub reveal_text: Option<String>,
    pub reveal_visible: Vec<String>,
}

impl ClickEffect {
    pub fn goto(url: &str) -> Self {
        Self {
            goto: Some(url.to_string()),
            ..Default::default()
        }
    }

    pub fn reveal(text: &str) -> Self {
        Self {
            reveal_text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct MockState {
    pages: HashMap<String, MockPage>,
    current: String,
    actions: Vec<String>,
    polls: Vec<String>,
    click_effects: HashMap<(String, String), ClickEffect>,
    appear_after: HashMap<String, u32>,
    fault_on: HashSet<String>,
    closed: bool,
}

pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Arc<Self> {
        let mut state = MockState::default();
        state.pages.insert("/".to_string(), MockPage::default());
        state.current = "/".to_string();
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    pub fn with_page(self: Arc<Self>, url: &str, page: MockPage) -> Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), page);
        self
    }

    pub fn with_click_effect(self: Arc<Self>, page: &str, locator: &str, effect: ClickEffect) -> Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .click_effects
            .insert((page.to_string(), locator.to_string()), effect);
        self
    }

    /// Locator becomes visible only after N visibility polls
    pub fn with_appearance_delay(self: Arc<Self>, locator: &str, polls: u32) -> Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .appear_after
            .insert(locator.to_string(), polls);
        self
    }

    /// Interacting with the locator raises a driver fault
    pub fn with_fault_on(self: Arc<Self>, locator: &str) -> Arc<Self> {
        self.state
            .lock()
            .unwrap()
            .fault_on
            .insert(locator.to_string());
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn polls(&self) -> Vec<String> {
        self.state.lock().unwrap().polls.clone()
    }

    pub fn was_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl BrowserDriver for Arc<MockDriver> {
    fn session_name(&self) -> String {
        "mock".to_string()
    }

    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("goto {}", url));
        if !state.pages.contains_key(url) {
            state.pages.insert(url.to_string(), MockPage::default());
        }
        state.current = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        let key = locator.to_string();
        let mut state = self.state.lock().unwrap();
        state.polls.push(key.clone());

        if let Some(remaining) = state.appear_after.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(false);
            }
        }

        let current = state.current.clone();
        Ok(state
            .pages
            .get(&current)
            .map(|p| p.visible.contains(&key))
            .unwrap_or(false))
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let key = locator.to_string();
        let mut state = self.state.lock().unwrap();

        if state.fault_on.contains(&key) {
            anyhow::bail!("mock driver fault clicking {}", key);
        }

        state.actions.push(format!("click {}", key));

        let current = state.current.clone();
        if let Some(effect) = state.click_effects.get(&(current.clone(), key)).cloned() {
            if let Some(url) = effect.goto {
                if !state.pages.contains_key(&url) {
                    state.pages.insert(url.clone(), MockPage::default());
                }
                state.current = url;
            }
            let current = state.current.clone();
            if let Some(page) = state.pages.get_mut(&current) {
                if let Some(text) = effect.reveal_text {
                    page.text.push(' ');
                    page.text.push_str(&text);
                }
                page.visible.extend(effect.reveal_visible);
            }
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let key = locator.to_string();
        let mut state = self.state.lock().unwrap();
        if state.fault_on.contains(&key) {
            anyhow::bail!("mock driver fault filling {}", key);
        }
        state.actions.push(format!("fill {}={}", key, value));
        Ok(())
    }

    async fn visible_text(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pages
            .get(&state.current)
            .map(|p| p.text.clone())
            .unwrap_or_default())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("screenshot {}", path.display()));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.actions.push("close".to_string());
        Ok(())
    }
}

/// Hands out pre-scripted sessions in order; creates blank ones when the
/// queue runs dry (recycle tests rely on this).
pub struct MockSessionFactory {
    queued: Mutex<VecDeque<Arc<MockDriver>>>,
    created: Mutex<Vec<Arc<MockDriver>>>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, driver: Arc<MockDriver>) {
        self.queued.lock().unwrap().push_back(driver);
    }

    pub fn created(&self) -> Vec<Arc<MockDriver>> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn create(&self) -> Result<Box<dyn BrowserDriver>> {
        let driver = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(MockDriver::new);
        self.created.lock().unwrap().push(driver.clone());
        Ok(Box::new(driver))
    }
}

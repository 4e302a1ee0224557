//! In-memory page and validator shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use sitecheck_engine::context::Context;
use sitecheck_engine::validator::{MarkupValidator, ValidationMessage};
use sitecheck_engine::{EngineError, EngineResult, Navigation, Page, Scenario, Test, TestSuite};

/// A rendered document the fake browser can show
#[derive(Debug, Clone, Default)]
pub struct FakeDoc {
    pub status: u16,
    pub title: String,
    /// Visible text, searched by `find_text`
    pub text: String,
    pub html: String,
    /// Match counts per selector; unlisted selectors match nothing
    pub selectors: HashMap<String, usize>,
}

impl FakeDoc {
    pub fn new(text: &str) -> Self {
        Self {
            status: 200,
            text: text.to_string(),
            html: format!("<!doctype html><title>t</title><p>{text}</p>"),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_selector(mut self, selector: &str, count: usize) -> Self {
        self.selectors.insert(selector.to_string(), count);
        self
    }
}

type Responder = Arc<dyn Fn(&str) -> FakeDoc + Send + Sync>;

#[derive(Default)]
struct State {
    routes: HashMap<String, FakeDoc>,
    unreachable: HashSet<String>,
    hanging: HashSet<String>,
    vanishing: HashSet<String>,
    current: FakeDoc,
    /// Value sitting in the email input; `find_text` sees it like a
    /// browser's find-in-page does
    input_value: String,
    typed: Option<String>,
    on_submit: Option<Responder>,
    fail_click: bool,
    fail_queries: bool,
    require_forms: bool,
    validation_disabled: bool,
    visited: Vec<String>,
}

/// Scriptable stand-in for a browser page
#[derive(Default)]
pub struct FakePage {
    state: Mutex<State>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page showing `doc` without any navigation
    pub fn showing(doc: FakeDoc) -> Self {
        let page = Self::new();
        page.state.lock().current = doc;
        page
    }

    pub fn route(self, url: &str, doc: FakeDoc) -> Self {
        self.state.lock().routes.insert(url.to_string(), doc);
        self
    }

    pub fn unreachable(self, url: &str) -> Self {
        self.state.lock().unreachable.insert(url.to_string());
        self
    }

    /// Document the server answers with after a form submission,
    /// given the submitted email.
    pub fn on_submit(self, respond: impl Fn(&str) -> FakeDoc + Send + Sync + 'static) -> Self {
        self.state.lock().on_submit = Some(Arc::new(respond));
        self
    }

    /// Navigation to `url` never completes
    pub fn hanging(self, url: &str) -> Self {
        self.state.lock().hanging.insert(url.to_string());
        self
    }

    /// `url` loads once and is unreachable afterwards
    pub fn vanishing(self, url: &str) -> Self {
        self.state.lock().vanishing.insert(url.to_string());
        self
    }

    /// Typing fails unless the current document has the target input
    pub fn requiring_forms(self) -> Self {
        self.state.lock().require_forms = true;
        self
    }

    pub fn failing_click(self) -> Self {
        self.state.lock().fail_click = true;
        self
    }

    pub fn failing_queries(self) -> Self {
        self.state.lock().fail_queries = true;
        self
    }

    pub fn typed(&self) -> Option<String> {
        self.state.lock().typed.clone()
    }

    pub fn validation_disabled(&self) -> bool {
        self.state.lock().validation_disabled
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().visited.clone()
    }
}

#[async_trait]
impl Page for FakePage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> EngineResult<Navigation> {
        let hangs = {
            let mut state = self.state.lock();
            state.visited.push(url.to_string());
            state.hanging.contains(url)
        };
        if hangs {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock();
        let gone = state.vanishing.contains(url) && state.visited.iter().filter(|v| *v == url).count() > 1;
        if gone || state.unreachable.contains(url) {
            return Err(EngineError::Navigation(format!("net::ERR_CONNECTION_REFUSED at {url}")));
        }
        let doc = state
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| FakeDoc::new("Not Found").with_status(404));
        let status = doc.status;
        state.current = doc;
        state.input_value.clear();
        Ok(Navigation { status })
    }

    async fn query_count(&self, selector: &str) -> EngineResult<usize> {
        let state = self.state.lock();
        if state.fail_queries {
            return Err(EngineError::Observation(format!("bad selector {selector}")));
        }
        Ok(state.current.selectors.get(selector).copied().unwrap_or(0))
    }

    async fn find_text(&self, text: &str) -> EngineResult<bool> {
        let state = self.state.lock();
        if state.fail_queries {
            return Err(EngineError::Observation("find failed".into()));
        }
        Ok(state.current.text.contains(text) || state.input_value.contains(text))
    }

    async fn title(&self) -> EngineResult<String> {
        let state = self.state.lock();
        if state.fail_queries {
            return Err(EngineError::Observation("title failed".into()));
        }
        Ok(state.current.title.clone())
    }

    async fn content(&self) -> EngineResult<String> {
        Ok(self.state.lock().current.html.clone())
    }

    async fn type_text(&self, selector: &str, text: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.require_forms && state.current.selectors.get(selector).copied().unwrap_or(0) == 0 {
            return Err(EngineError::Observation(format!("waiting for locator('{selector}')")));
        }
        state.input_value = text.to_string();
        state.typed = Some(text.to_string());
        Ok(())
    }

    async fn click(&self, _selector: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.fail_click {
            return Err(EngineError::Observation("element is not attached to the DOM".into()));
        }
        let typed = state.typed.clone().unwrap_or_default();
        if let Some(respond) = state.on_submit.clone() {
            state.current = respond(&typed);
        }
        // The response page re-renders the form with the submitted value.
        state.input_value = typed;
        Ok(())
    }

    async fn wait_for_navigation(&self) -> EngineResult<()> {
        Ok(())
    }

    async fn disable_form_validation(&self) -> EngineResult<()> {
        self.state.lock().validation_disabled = true;
        Ok(())
    }

    async fn clear_value(&self, _selector: &str) -> EngineResult<()> {
        self.state.lock().input_value.clear();
        Ok(())
    }
}

/// Validator returning a fixed set of messages
pub struct FakeValidator {
    pub messages: Vec<ValidationMessage>,
}

impl FakeValidator {
    pub fn clean() -> Self {
        Self { messages: vec![] }
    }

    pub fn with_errors(n: usize) -> Self {
        let messages = (0..n)
            .map(|i| ValidationMessage {
                kind: "error".to_string(),
                sub_type: None,
                message: format!("problem {i}"),
                last_line: Some(i as u64 + 1),
            })
            .collect();
        Self { messages }
    }
}

#[async_trait]
impl MarkupValidator for FakeValidator {
    async fn validate(&self, _html: &str) -> EngineResult<Vec<ValidationMessage>> {
        Ok(self.messages.clone())
    }
}

pub fn test(key: &str, it: &str) -> Test {
    Test {
        key: key.to_string(),
        it: it.to_string(),
        desc: format!("Checks that {it}."),
        wrap: false,
        passed: None,
        context: Context::new(),
        check: None,
    }
}

pub fn scenario(key: &str, when: &str, tests: Vec<Test>) -> Scenario {
    Scenario {
        key: key.to_string(),
        when: when.to_string(),
        context: Context::new(),
        visit: None,
        tests,
    }
}

pub fn suite(scenarios: Vec<Scenario>) -> TestSuite {
    TestSuite {
        name: "Event site checklist".to_string(),
        context: Context::new(),
        scenarios,
    }
}

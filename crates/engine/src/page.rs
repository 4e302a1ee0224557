//! Browser page capability
//!
//! Probes only ever talk to a page through this trait. The production
//! implementation is [`crate::playwright::PlaywrightHandle`]; tests plug in
//! an in-memory page.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Outcome of a top-level navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    /// HTTP status of the main document, 0 when the browser reported none
    pub status: u16,
}

impl Navigation {
    pub fn is_ok(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

#[async_trait]
pub trait Page: Send + Sync {
    /// Load `url`, failing once `timeout` elapses.
    async fn navigate(&self, url: &str, timeout: Duration) -> EngineResult<Navigation>;

    /// Number of elements matching a CSS selector.
    async fn query_count(&self, selector: &str) -> EngineResult<usize>;

    /// Case-sensitive search of the rendered page text, like the
    /// browser's find-in-page.
    async fn find_text(&self, text: &str) -> EngineResult<bool>;

    async fn title(&self) -> EngineResult<String>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> EngineResult<String>;

    async fn type_text(&self, selector: &str, text: &str) -> EngineResult<()>;

    async fn click(&self, selector: &str) -> EngineResult<()>;

    /// Resolves once the next navigation has committed and loaded.
    async fn wait_for_navigation(&self) -> EngineResult<()>;

    /// Turn off HTML5 constraint validation on every form.
    async fn disable_form_validation(&self) -> EngineResult<()>;

    /// Empty the value of every input matching `selector`.
    async fn clear_value(&self, selector: &str) -> EngineResult<()>;
}

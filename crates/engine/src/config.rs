//! Runner configuration
//!
//! Every field has a default, so a TOML file only needs the keys it wants
//! to change:
//!
//! ```toml
//! navigation_timeout_secs = 15
//! email_domain = "yale.edu"
//!
//! [playwright]
//! browser = "firefox"
//!
//! [rsvp]
//! email_selector = "#rsvp input[type=email]"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::playwright::PlaywrightConfig;
use crate::rsvp::RsvpForm;
use crate::validator::DEFAULT_VALIDATOR_URL;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,

    /// Upper bound for a single page load; expiry counts as a failure
    pub navigation_timeout_secs: u64,

    /// Nu HTML Checker endpoint
    pub validator_url: String,
    pub validator_timeout_secs: u64,

    /// Domain for generated RSVP addresses
    pub email_domain: Option<String>,

    pub rsvp: RsvpForm,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            navigation_timeout_secs: 10,
            validator_url: DEFAULT_VALIDATOR_URL.to_string(),
            validator_timeout_secs: 30,
            email_domain: None,
            rsvp: RsvpForm::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_toml(content: &str) -> EngineResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn validator_timeout(&self) -> Duration {
        Duration::from_secs(self.validator_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::Browser;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RunnerConfig::from_toml("").unwrap(), RunnerConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = RunnerConfig::from_toml(
            r#"
navigation_timeout_secs = 15
email_domain = "yale.edu"

[playwright]
browser = "firefox"
headless = false

[rsvp]
email_selector = "form input[type=email]"
"#,
        )
        .unwrap();

        assert_eq!(config.navigation_timeout(), Duration::from_secs(15));
        assert_eq!(config.email_domain.as_deref(), Some("yale.edu"));
        assert_eq!(config.playwright.browser, Browser::Firefox);
        assert!(!config.playwright.headless);
        assert_eq!(config.playwright.request_timeout_secs, 30);
        assert_eq!(config.rsvp.email_selector, "form input[type=email]");
        assert_eq!(config.rsvp.submit_selector, RsvpForm::default().submit_selector);
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(RunnerConfig::from_toml("navigation_timeout_secs = \"soon\"").is_err());
    }
}

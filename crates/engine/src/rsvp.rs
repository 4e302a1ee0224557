//! RSVP form protocol
//!
//! The one probe with side effects: it submits an email address through
//! the site's RSVP form and checks how the server answered.
//!
//! ```text
//! Idle ──disable validation──▶ FormPrepared ──type + submit──▶ Submitted
//!   │                              │                              │
//!   └──────────── error ───────────┴──────────── error ──▶ Failed │
//!                                                                 ▼
//!                                            Verified(Accept | Reject)
//! ```
//!
//! An accepted address must be echoed back together with its confirmation
//! code, the first 7 hex digits of `sha256(email)`. The site can compute
//! the same code without sharing anything with us, so seeing it proves the
//! submission was processed. A rejected address must not be echoed and the
//! page must show a form error.
//!
//! A failure while submitting leaves the test's verdict as it was.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::context::{ctx, Context};
use crate::error::EngineResult;
use crate::page::Page;
use crate::probe::count_selectors;
use crate::recorder::record_test_status;
use crate::suite::TestSuite;

/// First 7 lowercase hex digits of the SHA-256 of `email`.
pub fn confirmation_hash(email: &str) -> String {
    let digest = hex::encode(Sha256::digest(email.as_bytes()));
    digest[..7].to_string()
}

/// Selectors locating the RSVP form and its error feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsvpForm {
    pub email_selector: String,
    pub submit_selector: String,

    /// Any match counts as a visible form error
    pub error_selectors: Vec<String>,
}

impl Default for RsvpForm {
    fn default() -> Self {
        Self {
            email_selector: "form input[name=\"email\"]".to_string(),
            submit_selector: "form [type=\"submit\"]".to_string(),
            error_selectors: [
                ".error",
                ".errors",
                ".form-error",
                ".form-errors",
                ".alert-danger",
                ".invalid-feedback",
                ".is-invalid",
                ".has-error",
                ".is-danger",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Which verification path ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpState {
    Idle,
    FormPrepared,
    Submitted,
    Verified(Expectation),
    Failed,
}

impl fmt::Display for RsvpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::FormPrepared => write!(f, "form-prepared"),
            Self::Submitted => write!(f, "submitted"),
            Self::Verified(Expectation::Accept) => write!(f, "verified(accept)"),
            Self::Verified(Expectation::Reject) => write!(f, "verified(reject)"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one protocol run, before it is recorded
#[derive(Debug, Clone, PartialEq)]
pub struct RsvpOutcome {
    pub state: RsvpState,

    /// `None` when submission failed
    pub passed: Option<bool>,

    pub context: Context,
}

struct Attempt<'a, P: Page + ?Sized> {
    page: &'a P,
    form: &'a RsvpForm,
    state: RsvpState,
}

impl<'a, P: Page + ?Sized> Attempt<'a, P> {
    fn advance(&mut self, next: RsvpState) {
        debug!("RSVP {} -> {}", self.state, next);
        self.state = next;
    }

    async fn submit(&mut self, email: &str) -> EngineResult<()> {
        self.page.disable_form_validation().await?;
        self.advance(RsvpState::FormPrepared);

        self.page.type_text(&self.form.email_selector, email).await?;
        tokio::try_join!(
            self.page.wait_for_navigation(),
            self.page.click(&self.form.submit_selector),
        )?;
        self.advance(RsvpState::Submitted);

        // A leftover input value would satisfy the text search below.
        self.page.clear_value(&self.form.email_selector).await
    }

    async fn verify_accept(&mut self, email: &str) -> (bool, Context) {
        let code = confirmation_hash(email);
        let found = tokio::try_join!(self.page.find_text(email), self.page.find_text(&code));
        self.advance(RsvpState::Verified(Expectation::Accept));

        let passed = match found {
            Ok((email_shown, code_shown)) => {
                debug!("RSVP accept: email shown {}, code shown {}", email_shown, code_shown);
                email_shown && code_shown
            }
            Err(e) => {
                warn!("RSVP accept verification failed: {}", e);
                false
            }
        };

        let context = ctx([
            ("email", Value::from(email)),
            ("confirmationCode", Value::from(code)),
        ]);
        (passed, context)
    }

    async fn verify_reject(&mut self, email: &str) -> (bool, Context) {
        let observed = tokio::try_join!(
            self.page.find_text(email),
            count_selectors(self.page, self.form.error_selectors.as_slice()),
        );
        self.advance(RsvpState::Verified(Expectation::Reject));

        let passed = match observed {
            Ok((email_shown, counts)) => {
                let errors_shown = counts.iter().any(|&c| c > 0);
                debug!("RSVP reject: email shown {}, error shown {}", email_shown, errors_shown);
                !email_shown && errors_shown
            }
            Err(e) => {
                warn!("RSVP reject verification failed: {}", e);
                false
            }
        };

        (passed, ctx([("email", email)]))
    }
}

/// Drive the form once and evaluate the response without touching a suite.
pub async fn run_rsvp<P>(page: &P, form: &RsvpForm, email: &str, is_ok: bool) -> RsvpOutcome
where
    P: Page + ?Sized,
{
    let mut attempt = Attempt {
        page,
        form,
        state: RsvpState::Idle,
    };

    if let Err(e) = attempt.submit(email).await {
        warn!("RSVP submission of {} failed in state {}: {}", email, attempt.state, e);
        attempt.advance(RsvpState::Failed);
        return RsvpOutcome {
            state: attempt.state,
            passed: None,
            context: Context::new(),
        };
    }

    let (passed, context) = if is_ok {
        attempt.verify_accept(email).await
    } else {
        attempt.verify_reject(email).await
    };

    RsvpOutcome {
        state: attempt.state,
        passed: Some(passed),
        context,
    }
}

/// Submit `email` through the RSVP form and record whether the site
/// accepted (`is_ok`) or rejected it as expected.
pub async fn check_rsvp<P>(
    suite: &TestSuite,
    page: &P,
    form: &RsvpForm,
    scenario_key: &str,
    test_key: &str,
    email: &str,
    is_ok: bool,
) -> TestSuite
where
    P: Page + ?Sized,
{
    let outcome = run_rsvp(page, form, email, is_ok).await;

    match outcome.passed {
        Some(passed) => {
            info!(
                "RSVP {}/{} with {} -> {}",
                scenario_key,
                test_key,
                email,
                if passed { "pass" } else { "fail" }
            );
            record_test_status(passed, suite, scenario_key, test_key, Some(&outcome.context))
        }
        None => suite.clone(),
    }
}

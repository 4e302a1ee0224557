//! Probes: page observations turned into verdicts
//!
//! A probe observes the page, applies a predicate and records the result
//! through the recorder. Observation failures never escape a probe; they
//! become a failing verdict for that one test.

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;
use tracing::{debug, warn};

use crate::context::{ctx, Context};
use crate::error::EngineResult;
use crate::page::Page;
use crate::recorder::record_test_status;
use crate::suite::TestSuite;
use crate::validator::{error_count, MarkupValidator};

pub type CountFn = Arc<dyn Fn(&[usize]) -> bool + Send + Sync>;
pub type FoundFn = Arc<dyn Fn(&[bool]) -> bool + Send + Sync>;

/// Verdict over per-selector match counts
#[derive(Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPredicate {
    /// The first selector matches nothing
    None,
    /// The first selector matches at least once
    AtLeastOne,
    /// Every selector matches exactly once
    AllExactlyOne,
    /// Every selector matches at least once
    EveryAtLeastOne,
    /// Some selector matches, e.g. one of several CSS frameworks is linked
    AnyAtLeastOne,
    #[serde(skip_deserializing)]
    Custom(CountFn),
}

impl CountPredicate {
    pub fn custom(f: impl Fn(&[usize]) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn evaluate(&self, counts: &[usize]) -> bool {
        match self {
            Self::None => counts.first() == Some(&0),
            Self::AtLeastOne => counts.first().is_some_and(|&c| c >= 1),
            Self::AllExactlyOne => counts.iter().all(|&c| c == 1),
            Self::EveryAtLeastOne => counts.iter().all(|&c| c >= 1),
            Self::AnyAtLeastOne => counts.iter().any(|&c| c > 0),
            Self::Custom(f) => f(counts),
        }
    }
}

/// Verdict over per-string presence flags
#[derive(Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoundPredicate {
    AllTrue,
    AllFalse,
    #[serde(skip_deserializing)]
    Custom(FoundFn),
}

impl FoundPredicate {
    pub fn custom(f: impl Fn(&[bool]) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn evaluate(&self, found: &[bool]) -> bool {
        match self {
            Self::AllTrue => found.iter().all(|&f| f),
            Self::AllFalse => found.iter().all(|&f| !f),
            Self::Custom(f) => f(found),
        }
    }
}

impl CountPredicate {
    /// Name used in suite files; `custom` for code-only predicates
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::AtLeastOne => "at_least_one",
            Self::AllExactlyOne => "all_exactly_one",
            Self::EveryAtLeastOne => "every_at_least_one",
            Self::AnyAtLeastOne => "any_at_least_one",
            Self::Custom(_) => "custom",
        }
    }
}

impl FoundPredicate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AllTrue => "all_true",
            Self::AllFalse => "all_false",
            Self::Custom(_) => "custom",
        }
    }
}

// Always a bare string, so a suite with custom predicates still renders.
impl Serialize for CountPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl Serialize for FoundPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl fmt::Debug for CountPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::AtLeastOne => write!(f, "AtLeastOne"),
            Self::AllExactlyOne => write!(f, "AllExactlyOne"),
            Self::EveryAtLeastOne => write!(f, "EveryAtLeastOne"),
            Self::AnyAtLeastOne => write!(f, "AnyAtLeastOne"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl fmt::Debug for FoundPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTrue => write!(f, "AllTrue"),
            Self::AllFalse => write!(f, "AllFalse"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

// Custom predicates compare by identity.
impl PartialEq for CountPredicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl PartialEq for FoundPredicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

/// Count matches for each selector, concurrently.
pub async fn count_selectors<P, S>(page: &P, selectors: &[S]) -> EngineResult<Vec<usize>>
where
    P: Page + ?Sized,
    S: AsRef<str>,
{
    try_join_all(selectors.iter().map(|s| page.query_count(s.as_ref()))).await
}

/// Search the page for each string, concurrently.
pub async fn find_strings<P, S>(page: &P, strings: &[S]) -> EngineResult<Vec<bool>>
where
    P: Page + ?Sized,
    S: AsRef<str>,
{
    try_join_all(strings.iter().map(|s| page.find_text(s.as_ref()))).await
}

pub async fn check_selectors<P, S>(
    suite: &TestSuite,
    page: &P,
    scenario_key: &str,
    test_key: &str,
    selectors: &[S],
    predicate: &CountPredicate,
    context: Option<&Context>,
) -> TestSuite
where
    P: Page + ?Sized,
    S: AsRef<str>,
{
    let passed = match count_selectors(page, selectors).await {
        Ok(counts) => {
            debug!("{}/{} selector counts {:?}", scenario_key, test_key, counts);
            predicate.evaluate(&counts)
        }
        Err(e) => {
            warn!("{}/{} selector probe failed: {}", scenario_key, test_key, e);
            false
        }
    };

    record_test_status(passed, suite, scenario_key, test_key, context)
}

pub async fn check_strings<P, S>(
    suite: &TestSuite,
    page: &P,
    scenario_key: &str,
    test_key: &str,
    strings: &[S],
    predicate: &FoundPredicate,
    context: Option<&Context>,
) -> TestSuite
where
    P: Page + ?Sized,
    S: AsRef<str>,
{
    let passed = match find_strings(page, strings).await {
        Ok(found) => {
            debug!("{}/{} text found {:?}", scenario_key, test_key, found);
            predicate.evaluate(&found)
        }
        Err(e) => {
            warn!("{}/{} text probe failed: {}", scenario_key, test_key, e);
            false
        }
    };

    record_test_status(passed, suite, scenario_key, test_key, context)
}

/// Pass when the page has a non-empty title (containing `contains`, if
/// given). Observed title lands in the test context as `title`.
pub async fn check_title<P>(
    suite: &TestSuite,
    page: &P,
    scenario_key: &str,
    test_key: &str,
    contains: Option<&str>,
) -> TestSuite
where
    P: Page + ?Sized,
{
    match page.title().await {
        Ok(title) => {
            let trimmed = title.trim();
            let passed = !trimmed.is_empty() && contains.map_or(true, |c| trimmed.contains(c));
            let observed = ctx([("title", trimmed)]);
            record_test_status(passed, suite, scenario_key, test_key, Some(&observed))
        }
        Err(e) => {
            warn!("{}/{} title probe failed: {}", scenario_key, test_key, e);
            record_test_status(false, suite, scenario_key, test_key, None)
        }
    }
}

/// Pass when the validator reports no errors for the current document.
/// The error count lands in the test context as `markupErrors`.
pub async fn check_markup<P, V>(
    suite: &TestSuite,
    page: &P,
    validator: &V,
    scenario_key: &str,
    test_key: &str,
) -> TestSuite
where
    P: Page + ?Sized,
    V: MarkupValidator + ?Sized,
{
    let outcome = match page.content().await {
        Ok(html) => validator.validate(&html).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(messages) => {
            let errors = error_count(&messages);
            debug!("{}/{} markup errors: {}", scenario_key, test_key, errors);
            let observed = ctx([("markupErrors", json!(errors))]);
            record_test_status(errors == 0, suite, scenario_key, test_key, Some(&observed))
        }
        Err(e) => {
            warn!("{}/{} markup probe failed: {}", scenario_key, test_key, e);
            record_test_status(false, suite, scenario_key, test_key, None)
        }
    }
}

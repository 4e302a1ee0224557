//! Run driver: walks the suite against one live site
//!
//! The suite is threaded by value through every step; each probe returns
//! the next snapshot. Scenarios run one after another in declaration
//! order and the page is only ever touched by one step at a time.
//!
//! The first scenario always loads a page (its `visit`, or the site root).
//! If that load fails the run stops and the partial suite is returned.
//! Later load failures fail the scenario's `reachable` tests and skip the
//! rest of that scenario; a following scenario without a `visit` has no
//! page to look at and is skipped the same way.
//!
//! Every `rsvp` check reloads the scenario's page before submitting, so
//! each attempt starts from the form rather than the previous response.

use std::time::{Duration, Instant};

use serde_json::json;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::context::ctx;
use crate::data::{random_email, random_invalid_email};
use crate::error::{EngineError, EngineResult};
use crate::page::{Navigation, Page};
use crate::probe::{check_markup, check_selectors, check_strings, check_title};
use crate::recorder::{add_context_to_when, record_test_status};
use crate::report::{context_for_test, AmbientVars};
use crate::rsvp::check_rsvp;
use crate::suite::{Check, Scenario, Test, TestSuite};
use crate::template::render_str;
use crate::validator::MarkupValidator;

// Slack on top of the navigation budget the page enforces itself.
const NAVIGATION_GRACE: Duration = Duration::from_secs(2);

/// Final suite of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub suite: TestSuite,

    /// Set when the run stopped before visiting every scenario
    pub aborted: Option<String>,

    pub duration_ms: u64,
}

pub struct Driver<'a, P: Page + ?Sized, V: MarkupValidator + ?Sized> {
    page: &'a P,
    validator: &'a V,
    config: &'a RunnerConfig,
    ambient: AmbientVars,
}

impl<'a, P, V> Driver<'a, P, V>
where
    P: Page + ?Sized,
    V: MarkupValidator + ?Sized,
{
    pub fn new(page: &'a P, validator: &'a V, config: &'a RunnerConfig, ambient: AmbientVars) -> Self {
        Self {
            page,
            validator,
            config,
            ambient,
        }
    }

    /// Absolute URL for a scenario's `visit` path.
    pub fn resolve(&self, path: &str) -> EngineResult<String> {
        let base = reqwest::Url::parse(&self.ambient.url)
            .map_err(|e| EngineError::Navigation(format!("bad target url {}: {}", self.ambient.url, e)))?;
        let url = base
            .join(path)
            .map_err(|e| EngineError::Navigation(format!("bad path {}: {}", path, e)))?;
        Ok(url.to_string())
    }

    async fn navigate(&self, path: &str) -> EngineResult<(String, Navigation)> {
        let url = self.resolve(path)?;
        let budget = self.config.navigation_timeout();

        debug!("Navigating to {}", url);
        let nav = timeout(budget + NAVIGATION_GRACE, self.page.navigate(&url, budget))
            .await
            .map_err(|_| EngineError::Timeout(format!("navigation to {url}")))??;

        if !nav.is_ok() {
            warn!("{} answered with status {}", url, nav.status);
        }
        Ok((url, nav))
    }

    /// Run every scenario and return the final suite.
    pub async fn run(&self, suite: TestSuite) -> RunOutcome {
        let start = Instant::now();
        let mut suite = suite;
        // Page currently in the browser; cleared when a navigation fails
        let mut current: Option<(String, Navigation)> = None;
        let mut started = false;

        info!("Running suite '{}' against {}", suite.name, self.ambient.url);

        let scenarios = suite.scenarios.clone();
        for scenario in &scenarios {
            info!("When {}", scenario.key);

            let path = match (&scenario.visit, &current) {
                (Some(path), _) => Some(path.as_str()),
                (None, None) if !started => Some("/"),
                (None, None) => {
                    warn!("Skipping scenario {}: no page loaded", scenario.key);
                    suite = Self::fail_reachability(&suite, scenario);
                    continue;
                }
                (None, Some(_)) => None,
            };

            if let Some(path) = path {
                let first = !started;
                started = true;
                match self.navigate(path).await {
                    Ok((url, nav)) => {
                        let observed = ctx([("status", json!(nav.status)), ("pageUrl", json!(url))]);
                        suite = add_context_to_when(&suite, &scenario.key, &observed);
                        current = Some((url, nav));
                    }
                    Err(e) => {
                        current = None;
                        suite = Self::fail_reachability(&suite, scenario);
                        if first {
                            error!("Initial navigation failed: {}", e);
                            return RunOutcome {
                                suite,
                                aborted: Some(format!("{} is unreachable: {}", self.ambient.url, e)),
                                duration_ms: start.elapsed().as_millis() as u64,
                            };
                        }
                        warn!("Skipping scenario {}: {}", scenario.key, e);
                        continue;
                    }
                }
            }

            let Some((url, nav)) = current.clone() else {
                continue;
            };
            for test in &scenario.tests {
                if let Some(check) = &test.check {
                    suite = self.run_check(suite, scenario, test, check, &url, nav).await;
                }
            }
        }

        let tally = suite.tally();
        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Results: {} passed, {} failed, {} not run ({} ms)",
            tally.passed, tally.failed, tally.pending, duration_ms
        );

        RunOutcome {
            suite,
            aborted: None,
            duration_ms,
        }
    }

    fn fail_reachability(suite: &TestSuite, scenario: &Scenario) -> TestSuite {
        scenario
            .tests
            .iter()
            .filter(|t| t.check == Some(Check::Reachable))
            .fold(suite.clone(), |acc, t| {
                record_test_status(false, &acc, &scenario.key, &t.key, None)
            })
    }

    async fn run_check(
        &self,
        suite: TestSuite,
        scenario: &Scenario,
        test: &Test,
        check: &Check,
        page_url: &str,
        nav: Navigation,
    ) -> TestSuite {
        let (sk, tk) = (scenario.key.as_str(), test.key.as_str());
        debug!("Checking {}/{}: {:?}", sk, tk, check);

        match check {
            Check::Reachable => {
                let observed = ctx([("status", json!(nav.status))]);
                record_test_status(nav.is_ok(), &suite, sk, tk, Some(&observed))
            }
            Check::Title { contains } => check_title(&suite, self.page, sk, tk, contains.as_deref()).await,
            Check::Selectors { selectors, expect } => {
                check_selectors(&suite, self.page, sk, tk, selectors.as_slice(), expect, None).await
            }
            Check::Text { strings, expect } => match self.render_strings(&suite, sk, tk, strings) {
                Ok(rendered) => check_strings(&suite, self.page, sk, tk, rendered.as_slice(), expect, None).await,
                Err(e) => {
                    warn!("{}/{} text probe failed: {}", sk, tk, e);
                    record_test_status(false, &suite, sk, tk, None)
                }
            },
            Check::Rsvp { accept, domain } => {
                // A previous submission may have left a page without the form.
                if let Err(e) = self.navigate(page_url).await {
                    warn!("{}/{} could not reload {}: {}", sk, tk, page_url, e);
                    return record_test_status(false, &suite, sk, tk, None);
                }
                let domain = domain.as_deref().or(self.config.email_domain.as_deref());
                let email = if *accept {
                    random_email(domain)
                } else {
                    random_invalid_email(domain)
                };
                check_rsvp(&suite, self.page, &self.config.rsvp, sk, tk, &email, *accept).await
            }
            Check::Markup => check_markup(&suite, self.page, self.validator, sk, tk).await,
        }
    }

    /// Render `text` check strings against the test's current context.
    fn render_strings(
        &self,
        suite: &TestSuite,
        scenario_key: &str,
        test_key: &str,
        strings: &[String],
    ) -> EngineResult<Vec<String>> {
        let (Some(scenario), Some(test)) = (suite.scenario(scenario_key), suite.test(scenario_key, test_key))
        else {
            return Ok(strings.to_vec());
        };

        let context = context_for_test(suite, scenario, test, &self.ambient)?;
        strings.iter().map(|s| render_str(s, &context)).collect()
    }
}

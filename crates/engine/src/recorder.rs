//! Copy-on-write verdict transitions
//!
//! Every function here borrows a suite and hands back a fresh one. The
//! input is never touched, so a caller that keeps intermediate snapshots
//! gets an auditable log of the run for free.
//!
//! Precedence differs between the two writers: [`record_test_status`] keeps
//! existing test context on key collision, [`add_context_to_when`] lets the
//! new scenario context win.

use tracing::debug;

use crate::context::{merge_over, merge_under, Context};
use crate::suite::TestSuite;

/// Set a test's verdict and fold observed context under its existing
/// context. Unknown keys yield an unchanged copy.
pub fn record_test_status(
    status: bool,
    suite: &TestSuite,
    scenario_key: &str,
    test_key: &str,
    context: Option<&Context>,
) -> TestSuite {
    let mut next = suite.clone();

    let Some(test) = next
        .scenarios
        .iter_mut()
        .find(|s| s.key == scenario_key)
        .and_then(|s| s.tests.iter_mut().find(|t| t.key == test_key))
    else {
        debug!("No test {}/{} to record", scenario_key, test_key);
        return next;
    };

    test.passed = Some(status);
    if let Some(observed) = context {
        test.context = merge_under(&test.context, observed);
    }

    debug!(
        "Recorded {}/{} = {}",
        scenario_key,
        test_key,
        if status { "pass" } else { "fail" }
    );
    next
}

/// Fold `context` over a scenario's context. New values win.
pub fn add_context_to_when(suite: &TestSuite, scenario_key: &str, context: &Context) -> TestSuite {
    let mut next = suite.clone();

    match next.scenarios.iter_mut().find(|s| s.key == scenario_key) {
        Some(scenario) => scenario.context = merge_over(&scenario.context, context),
        None => debug!("No scenario {} to annotate", scenario_key),
    }

    next
}

/// Current verdict of a test; `None` when unevaluated or not found.
pub fn get_test_suite_result(suite: &TestSuite, scenario_key: &str, test_key: &str) -> Option<bool> {
    suite.test(scenario_key, test_key).and_then(|t| t.passed)
}

//! sitecheck grading engine
//!
//! Walks a YAML checklist of behavioral assertions against a live website
//! and renders a pass/fail report for the team that built it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Driver                               │
//! │    ├── navigate(scenario.visit) -> Navigation               │
//! │    ├── run_check(test.check) -> TestSuite                   │
//! │    └── RunOutcome { suite, aborted }                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Probes (probe.rs, rsvp.rs)                                 │
//! │    ├── check_selectors / check_strings / check_title        │
//! │    ├── check_markup  ── MarkupValidator (Nu checker)        │
//! │    └── check_rsvp    ── confirmation_hash(email)            │
//! │          all observe through Page (Playwright bridge)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSuite (YAML)                                           │
//! │    ├── name, context                                        │
//! │    └── scenarios: [Scenario]                                │
//! │          ├── key, when, context, visit?                     │
//! │          └── tests: [Test]                                  │
//! │                └── key, it, desc, wrap, passed, check?      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  recorder.rs: copy-on-write verdicts                        │
//! │  report.rs:   templates + glyphs -> text / JSON             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod context;
pub mod data;
pub mod driver;
pub mod error;
pub mod loader;
pub mod page;
pub mod playwright;
pub mod probe;
pub mod recorder;
pub mod report;
pub mod rsvp;
pub mod suite;
pub mod template;
pub mod validator;

pub use config::RunnerConfig;
pub use context::Context;
pub use driver::{Driver, RunOutcome};
pub use error::{EngineError, EngineResult};
pub use loader::{load_suite, parse_suite};
pub use page::{Navigation, Page};
pub use probe::{CountPredicate, FoundPredicate};
pub use recorder::{add_context_to_when, get_test_suite_result, record_test_status};
pub use report::{render, render_json, AmbientVars};
pub use rsvp::{check_rsvp, confirmation_hash, RsvpForm};
pub use suite::{Check, Scenario, Tally, Test, TestSuite};

//! Report rendering for finished suites

mod support;

use serde_json::json;
use sitecheck_engine::context::ctx;
use sitecheck_engine::report::{build_json_report, render_when, WRAP_WIDTH};
use sitecheck_engine::{add_context_to_when, parse_suite, record_test_status, render, render_json, AmbientVars, EngineError};
use support::{scenario, suite, test};

fn ambient() -> AmbientVars {
    AmbientVars {
        url: "https://night-owls.example.com".to_string(),
        course: "cpsc113".to_string(),
        nickname: "night-owls".to_string(),
    }
}

/// A passing reachability test renders with the pass glyph
#[test]
fn passing_test_renders_check_mark() {
    let s = suite(vec![scenario(
        "home",
        "visiting {{ url }}",
        vec![test("up", "the site is reachable")],
    )]);
    let s = record_test_status(true, &s, "home", "up", None);

    let report = render(&s, &ambient()).expect("report renders");

    assert!(report.starts_with("Event site checklist\n"));
    assert!(report.contains("course: cpsc113  team: night-owls  url: https://night-owls.example.com"));
    assert!(report.contains("\nWhen visiting https://night-owls.example.com\n"));
    assert!(report.contains("  ✓ it the site is reachable\n"));
    assert!(report.contains("      Checks that the site is reachable.\n"));
    assert!(report.trim_end().ends_with("1 passed, 0 failed, 0 not run (1 total)"));
}

/// Unevaluated and failed tests share the fail glyph but not the tally
#[test]
fn unevaluated_and_failed_render_alike() {
    let s = suite(vec![scenario(
        "home",
        "visiting the home page",
        vec![test("a", "has a title"), test("b", "has a footer")],
    )]);
    let s = record_test_status(false, &s, "home", "a", None);

    let report = render(&s, &ambient()).expect("report renders");
    assert!(report.contains("  ✗ it has a title\n"));
    assert!(report.contains("  ✗ it has a footer\n"));
    assert!(report.contains("0 passed, 1 failed, 1 not run (2 total)"));

    let json = build_json_report(&s, &ambient()).expect("json report");
    let tests = &json.scenarios[0].tests;
    assert_eq!(tests[0].passed, Some(false));
    assert_eq!(tests[1].passed, None);
}

/// Scenario context from navigation is visible to `when`
#[test]
fn scenario_context_feeds_when() {
    let s = suite(vec![scenario(
        "rsvp",
        "visiting {{ pageUrl }} (HTTP {{ status }})",
        vec![test("up", "loads")],
    )]);
    let s = add_context_to_when(
        &s,
        "rsvp",
        &ctx([("pageUrl", json!("https://night-owls.example.com/rsvp")), ("status", json!(200))]),
    );

    let rsvp = s.scenario("rsvp").expect("scenario exists");
    let when = render_when(&s, rsvp, &ambient()).expect("when renders");
    assert_eq!(when, "visiting https://night-owls.example.com/rsvp (HTTP 200)");
}

/// Test templates see their own context and the suite itself
#[test]
fn test_context_and_self_reference() {
    let mut t = test("accept", "accepts {{ email }}");
    t.desc = "Code {{ confirmationCode }} for suite {{ suite.name }}, test {{ test.key }}.".to_string();
    let s = suite(vec![scenario("rsvp", "submitting", vec![t])]);
    let s = record_test_status(
        true,
        &s,
        "rsvp",
        "accept",
        Some(&ctx([("email", "ada@example.com"), ("confirmationCode", "1a2b3c4")])),
    );

    let report = render(&s, &ambient()).expect("report renders");
    assert!(report.contains("✓ it accepts ada@example.com\n"));
    assert!(report.contains("Code 1a2b3c4 for suite Event site checklist, test accept."));
}

/// Test context shadows suite context
#[test]
fn inner_context_wins() {
    let mut s = suite(vec![scenario("home", "visiting", vec![test("t", "shows {{ event }}")])]);
    s.context = ctx([("event", "the suite event")]);
    let s = record_test_status(true, &s, "home", "t", Some(&ctx([("event", "trivia night")])));

    let report = render(&s, &ambient()).expect("report renders");
    assert!(report.contains("it shows trivia night"));
}

/// Long wrapped descriptions stay within the width plus indent
#[test]
fn wrapped_description() {
    let mut t = test("t", "explains itself");
    t.desc = "This description is long enough that it has to be wrapped over several lines \
              so that the report stays readable in a terminal window of ordinary width."
        .to_string();
    t.wrap = true;
    let s = suite(vec![scenario("home", "visiting", vec![t])]);

    let report = render(&s, &ambient()).expect("report renders");
    let desc_lines: Vec<&str> = report.lines().filter(|l| l.starts_with("      ")).collect();
    assert!(desc_lines.len() >= 2, "description should wrap: {report}");
    assert!(desc_lines.iter().all(|l| l.chars().count() <= WRAP_WIDTH + 6));
}

/// Undefined template variables are reported, not rendered blank
#[test]
fn undefined_variable_is_an_error() {
    let s = suite(vec![scenario("home", "visiting {{ nowhere }}", vec![test("t", "loads")])]);
    match render(&s, &ambient()) {
        Err(EngineError::Template(msg)) => assert!(msg.contains("nowhere"), "{msg}"),
        other => panic!("expected template error, got {other:?}"),
    }
}

/// JSON report carries ambient values, rendered text and the tally
#[test]
fn json_report_shape() {
    let s = parse_suite(
        r#"
name: Event site checklist
scenarios:
  - key: home
    when: "visiting {{ url }}"
    tests:
      - key: up
        it: the site is reachable
        desc: The home page answers with a 2xx or 3xx status.
        check: { probe: reachable }
"#,
    )
    .expect("suite parses");
    let s = record_test_status(true, &s, "home", "up", Some(&ctx([("status", 200)])));

    let text = render_json(&s, &ambient()).expect("json renders");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");

    assert_eq!(value["suite"], "Event site checklist");
    assert_eq!(value["course"], "cpsc113");
    assert_eq!(value["nickname"], "night-owls");
    assert_eq!(value["tally"]["passed"], 1);
    assert_eq!(value["scenarios"][0]["when"], "visiting https://night-owls.example.com");
    assert_eq!(value["scenarios"][0]["tests"][0]["passed"], true);
    assert_eq!(value["scenarios"][0]["tests"][0]["context"]["status"], 200);
    assert!(value["generated_at"].is_string());
}

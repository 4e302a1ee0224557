//! sitecheck CLI
//!
//! Loads a course suite, drives a real browser against a team's deployed
//! site and prints the graded checklist.

pub mod args;
pub mod output;

use anyhow::Context as _;
use tracing::{info, warn};

use sitecheck_engine::playwright::PlaywrightHandle;
use sitecheck_engine::validator::NuValidator;
use sitecheck_engine::{load_suite, Driver};

pub use args::Cli;

/// Grade one site and return the process exit code.
pub async fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = cli.runner_config()?;
    let suite_path = cli.suite_path();
    let suite = load_suite(&suite_path)
        .with_context(|| format!("Failed to load suite {}", suite_path.display()))?;

    let validator = NuValidator::new(config.validator_url.clone(), config.validator_timeout())
        .context("Failed to build validator client")?;
    let page = PlaywrightHandle::launch(&config.playwright, config.navigation_timeout())
        .await
        .context("Failed to launch browser")?;

    let ambient = cli.ambient();
    let outcome = Driver::new(&page, &validator, &config, ambient.clone()).run(suite).await;

    if let Err(e) = page.close().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }

    let report = output::render_report(&outcome.suite, &ambient, cli.format).context("Failed to render report")?;
    output::write_report(&report, cli.output.as_deref())?;
    if let Some(path) = &cli.output {
        info!("Report written to {}", path.display());
    }

    output::print_summary(&outcome);
    Ok(output::exit_code(&outcome))
}

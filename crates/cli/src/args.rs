//! Command-line arguments and how they fold into the runner configuration

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use regex::Regex;

use sitecheck_engine::playwright::Browser;
use sitecheck_engine::{AmbientVars, RunnerConfig};

use crate::output::OutputFormat;

/// sitecheck - grade a deployed event website against a course checklist
#[derive(Parser, Debug)]
#[command(name = "sitecheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Course identifier, e.g. cpsc113
    #[arg(value_parser = parse_course)]
    pub course: String,

    /// Team nickname shown in the report
    #[arg(value_parser = parse_nickname)]
    pub nickname: String,

    /// Absolute http(s) URL of the deployed site
    #[arg(value_parser = parse_url)]
    pub url: String,

    /// Suite file (defaults to suites/<course>.yaml)
    #[arg(long)]
    pub suite: Option<PathBuf>,

    /// Runner configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Browser engine: chromium, firefox or webkit
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Navigation timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Node.js executable for the browser bridge
    #[arg(long, env = "SITECHECK_NODE")]
    pub node: Option<PathBuf>,

    /// Nu HTML Checker endpoint
    #[arg(long, env = "SITECHECK_VALIDATOR_URL")]
    pub validator_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn suite_path(&self) -> PathBuf {
        self.suite
            .clone()
            .unwrap_or_else(|| PathBuf::from("suites").join(format!("{}.yaml", self.course)))
    }

    pub fn ambient(&self) -> AmbientVars {
        AmbientVars {
            url: self.url.clone(),
            course: self.course.clone(),
            nickname: self.nickname.clone(),
        }
    }

    /// Config file (or defaults) with command-line flags applied on top.
    pub fn runner_config(&self) -> anyhow::Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::from_file(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?,
            None => RunnerConfig::default(),
        };

        if let Some(browser) = self.browser {
            config.playwright.browser = browser;
        }
        if self.headed {
            config.playwright.headless = false;
        }
        if let Some(secs) = self.timeout_secs {
            config.navigation_timeout_secs = secs;
        }
        if let Some(node) = &self.node {
            config.playwright.node_binary = node.clone();
        }
        if let Some(url) = &self.validator_url {
            config.validator_url = url.clone();
        }

        Ok(config)
    }
}

fn parse_course(s: &str) -> Result<String, String> {
    let pattern = Regex::new(r"^[A-Za-z0-9_-]+$").map_err(|e| e.to_string())?;
    if pattern.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(format!("'{s}' is not a course identifier (letters, digits, '-' and '_')"))
    }
}

fn parse_nickname(s: &str) -> Result<String, String> {
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        Err("nickname must be non-empty and contain no whitespace".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn parse_url(s: &str) -> Result<String, String> {
    let url = reqwest::Url::parse(s).map_err(|e| format!("'{s}' is not an absolute URL: {e}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(s.to_string()),
        "http" | "https" => Err(format!("'{s}' has no host")),
        other => Err(format!("unsupported scheme '{other}', expected http or https")),
    }
}

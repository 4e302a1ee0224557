//! Playwright browser automation
//!
//! A single Node.js process hosts the browser for the whole run. We talk
//! to it over a JSON-lines protocol on stdin/stdout:
//!
//! ```text
//! → {"id": 7, "op": "query_count", "selector": "nav a"}
//! ← {"id": 7, "ok": true, "result": 5}
//! ← {"id": 8, "ok": false, "error": "Timeout 10000ms exceeded"}
//! ```
//!
//! The bridge answers requests as they complete, not in order, so a probe
//! can have several observations in flight and `click` can overlap with
//! `wait_for_navigation`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::page::{Navigation, Page};

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {
  const browser = await playwright[process.env.SITECHECK_BROWSER].launch({
    headless: process.env.SITECHECK_HEADLESS !== '0',
  });
  const context = await browser.newContext();
  const page = await context.newPage();

  const ops = {
    navigate: async ({ url, timeout_ms }) => {
      const resp = await page.goto(url, { timeout: timeout_ms, waitUntil: 'load' });
      return { status: resp ? resp.status() : 0 };
    },
    query_count: ({ selector }) => page.locator(selector).count(),
    find_text: ({ text }) =>
      page.evaluate((t) => {
        window.getSelection().removeAllRanges();
        return window.find(t, true, false, true);
      }, text),
    title: () => page.title(),
    content: () => page.content(),
    type_text: ({ selector, text }) => page.locator(selector).first().fill(text),
    click: ({ selector }) => page.locator(selector).first().click(),
    wait_for_navigation: ({ timeout_ms }) =>
      page.waitForNavigation({ timeout: timeout_ms, waitUntil: 'load' }).then(() => null),
    disable_form_validation: () =>
      page.evaluate(() => {
        for (const form of document.querySelectorAll('form')) form.noValidate = true;
        for (const el of document.querySelectorAll('[required],[pattern],[minlength],[maxlength]')) {
          for (const attr of ['required', 'pattern', 'minlength', 'maxlength']) el.removeAttribute(attr);
        }
        for (const el of document.querySelectorAll('input[type="email"]')) el.type = 'text';
      }),
    clear_value: ({ selector }) =>
      page.evaluate((s) => {
        for (const el of document.querySelectorAll(s)) el.value = '';
      }, selector),
  };

  const lines = readline.createInterface({ input: process.stdin });
  lines.on('line', async (line) => {
    let req;
    try {
      req = JSON.parse(line);
    } catch (e) {
      return;
    }
    try {
      const op = ops[req.op];
      if (!op) throw new Error('unknown op ' + req.op);
      const result = await op(req);
      send({ id: req.id, ok: true, result: result === undefined ? null : result });
    } catch (e) {
      send({ id: req.id, ok: false, error: String((e && e.message) || e) });
    }
  });
  lines.on('close', async () => {
    await browser.close();
    process.exit(0);
  });

  send({ ready: true });
})().catch((e) => {
  send({ fatal: String((e && e.message) || e) });
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser '{other}' (chromium, firefox, webkit)")),
        }
    }
}

/// Configuration for the Playwright bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Node.js executable
    pub node_binary: PathBuf,

    /// `node_modules` directory holding the `playwright` package
    /// (defaults to `./node_modules`)
    pub node_modules: Option<PathBuf>,

    pub browser: Browser,
    pub headless: bool,

    /// Budget for the browser to start
    pub launch_timeout_secs: u64,

    /// Budget for any single non-navigation request
    pub request_timeout_secs: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            node_modules: None,
            browser: Browser::Chromium,
            headless: true,
            launch_timeout_secs: 30,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    fatal: Option<String>,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

/// A live browser page behind the Node.js bridge; the production [`Page`]
pub struct PlaywrightHandle {
    child: Child,
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    pending: Pending,
    next_id: AtomicU64,
    request_timeout: Duration,
    /// Navigation budget used by `wait_for_navigation`
    navigation_timeout: Duration,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightHandle {
    /// Start node, launch the browser and open a page.
    pub async fn launch(config: &PlaywrightConfig, navigation_timeout: Duration) -> EngineResult<Self> {
        let node_path = Self::node_path(config)?;
        Self::check_playwright_installed(config, &node_path).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        info!("Launching {} via Playwright bridge", config.browser.as_str());

        let mut child = Command::new(&config.node_binary)
            .arg(&script_path)
            .env("NODE_PATH", &node_path)
            .env("SITECHECK_BROWSER", config.browser.as_str())
            .env("SITECHECK_HEADLESS", if config.headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::Bridge(format!("failed to spawn {}: {}", config.node_binary.display(), e))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| EngineError::Bridge("no stdin".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| EngineError::Bridge("no stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[bridge] {}", line);
                }
            });
        }

        let mut lines = BufReader::new(stdout).lines();
        let launch_budget = Duration::from_secs(config.launch_timeout_secs);
        let first = timeout(launch_budget, lines.next_line())
            .await
            .map_err(|_| EngineError::Timeout("browser launch".into()))??;

        match first.as_deref().map(serde_json::from_str::<Reply>) {
            Some(Ok(reply)) if reply.ready => {}
            Some(Ok(Reply { fatal: Some(msg), .. })) => return Err(EngineError::Bridge(msg)),
            Some(Ok(_)) | Some(Err(_)) => {
                return Err(EngineError::Bridge(format!("unexpected handshake: {:?}", first)))
            }
            None => return Err(EngineError::Bridge("bridge exited during launch".into())),
        }

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(Self::read_replies(lines, pending.clone()));

        Ok(Self {
            child,
            stdin: tokio::sync::Mutex::new(Some(stdin)),
            pending,
            next_id: AtomicU64::new(1),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            navigation_timeout,
            _script_dir: script_dir,
        })
    }

    fn node_path(config: &PlaywrightConfig) -> EngineResult<PathBuf> {
        match &config.node_modules {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?.join("node_modules")),
        }
    }

    /// Check that node runs and can resolve the playwright package
    async fn check_playwright_installed(config: &PlaywrightConfig, node_path: &Path) -> EngineResult<()> {
        let status = Command::new(&config.node_binary)
            .args(["-e", "require('playwright')"])
            .env("NODE_PATH", node_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(EngineError::BridgeNotFound),
        }
    }

    async fn read_replies(mut lines: tokio::io::Lines<BufReader<ChildStdout>>, pending: Pending) {
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match serde_json::from_str::<Reply>(&line) {
                    Ok(Reply { id: Some(id), ok, result, error, .. }) => {
                        if let Some(tx) = pending.lock().remove(&id) {
                            let _ = tx.send(Reply {
                                id: Some(id),
                                ok,
                                result,
                                error,
                                ready: false,
                                fatal: None,
                            });
                        }
                    }
                    Ok(Reply { fatal: Some(msg), .. }) => warn!("Bridge failed: {}", msg),
                    Ok(_) => debug!("Ignoring bridge line: {}", line),
                    Err(_) => debug!("[bridge stdout] {}", line),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("Reading from bridge failed: {}", e);
                    break;
                }
            }
        }

        // Dropping the senders wakes every waiter with an error.
        pending.lock().clear();
        debug!("Bridge reader finished");
    }

    async fn request(&self, op: &str, params: Value, budget: Duration) -> EngineResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let mut message = match params {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        message.insert("id".into(), json!(id));
        message.insert("op".into(), json!(op));
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');

        if let Err(e) = self.write_line(&line).await {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        match timeout(budget, rx).await {
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(EngineError::Timeout(op.to_string()))
            }
            Ok(Err(_)) => Err(EngineError::Bridge(format!("bridge exited during {op}"))),
            Ok(Ok(reply)) if reply.ok => Ok(reply.result),
            Ok(Ok(reply)) => Err(EngineError::Observation(format!(
                "{}: {}",
                op,
                reply.error.unwrap_or_else(|| "unknown error".to_string())
            ))),
        }
    }

    async fn write_line(&self, line: &str) -> EngineResult<()> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| EngineError::Bridge("bridge already closed".into()))?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn call(&self, op: &str, params: Value) -> EngineResult<Value> {
        self.request(op, params, self.request_timeout).await
    }

    /// Close stdin so the bridge shuts the browser down, then reap it.
    pub async fn close(mut self) -> EngineResult<()> {
        self.stdin.lock().await.take();

        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(status) => {
                debug!("Bridge exited with {}", status?);
            }
            Err(_) => {
                warn!("Bridge did not exit, killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Page for PlaywrightHandle {
    async fn navigate(&self, url: &str, timeout: Duration) -> EngineResult<Navigation> {
        let params = json!({ "url": url, "timeout_ms": timeout.as_millis() as u64 });
        let budget = timeout + Duration::from_secs(1);

        match self.request("navigate", params, budget).await {
            Ok(result) => Ok(serde_json::from_value(result)?),
            Err(EngineError::Observation(msg)) => Err(EngineError::Navigation(msg)),
            Err(e) => Err(e),
        }
    }

    async fn query_count(&self, selector: &str) -> EngineResult<usize> {
        let result = self.call("query_count", json!({ "selector": selector })).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn find_text(&self, text: &str) -> EngineResult<bool> {
        let result = self.call("find_text", json!({ "text": text })).await?;
        Ok(result.as_bool().unwrap_or(false))
    }

    async fn title(&self) -> EngineResult<String> {
        let result = self.call("title", json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn content(&self) -> EngineResult<String> {
        let result = self.call("content", json!({})).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn type_text(&self, selector: &str, text: &str) -> EngineResult<()> {
        self.call("type_text", json!({ "selector": selector, "text": text })).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> EngineResult<()> {
        self.call("click", json!({ "selector": selector })).await?;
        Ok(())
    }

    async fn wait_for_navigation(&self) -> EngineResult<()> {
        let params = json!({ "timeout_ms": self.navigation_timeout.as_millis() as u64 });
        let budget = self.navigation_timeout + Duration::from_secs(1);
        self.request("wait_for_navigation", params, budget).await?;
        Ok(())
    }

    async fn disable_form_validation(&self) -> EngineResult<()> {
        self.call("disable_form_validation", json!({})).await?;
        Ok(())
    }

    async fn clear_value(&self, selector: &str) -> EngineResult<()> {
        self.call("clear_value", json!({ "selector": selector })).await?;
        Ok(())
    }
}

//! E2B code-interpreter client: create a sandbox, run code, kill it.
//!
//! Sandbox lifecycle goes through the control plane (`E2B_API_URL`); code
//! runs against the per-sandbox execution daemon, which answers with one JSON
//! event per line until `end_of_execution`.

use std::{pin::Pin, time::Duration};

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt as _;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Error, Result};

/// Handle on a live sandbox session.
#[derive(Debug, Clone)]
pub struct Sandbox {
    pub id: String,
    access_token: Option<String>,
    exec_url: String,
}

impl Sandbox {
    pub fn exec_url(&self) -> &str {
        &self.exec_url
    }
}

/// One line of the execution daemon's response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Stdout { text: String },
    Stderr { text: String },
    Result {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        is_main_result: bool,
    },
    Error {
        name: String,
        value: String,
        #[serde(default)]
        traceback: String,
    },
    NumberOfExecutions { execution_count: u32 },
    EndOfExecution,
    #[serde(other)]
    Unknown,
}

/// Exception raised by the submitted code inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionError {
    pub name: String,
    pub value: String,
    pub traceback: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub results: Vec<String>,
    pub error: Option<ExecutionError>,
    pub execution_count: Option<u32>,
}

impl Execution {
    pub fn apply(&mut self, event: ExecutionEvent) {
        match event {
            ExecutionEvent::Stdout { text } => self.stdout.push(text),
            ExecutionEvent::Stderr { text } => self.stderr.push(text),
            ExecutionEvent::Result { text: Some(text), .. } => self.results.push(text),
            ExecutionEvent::Result { text: None, .. } => {}
            ExecutionEvent::Error { name, value, traceback } => {
                self.error = Some(ExecutionError { name, value, traceback })
            }
            ExecutionEvent::NumberOfExecutions { execution_count } => {
                self.execution_count = Some(execution_count)
            }
            ExecutionEvent::EndOfExecution | ExecutionEvent::Unknown => {}
        }
    }

    /// First captured stdout chunk without its trailing newline.
    pub fn first_stdout_line(&self) -> Result<String> {
        let first = self.stdout.first().ok_or_else(|| self.empty_output())?;
        let line = first.strip_suffix('\n').unwrap_or(first);
        Ok(line.strip_suffix('\r').unwrap_or(line).to_string())
    }

    /// Every stdout chunk followed by every stderr chunk. Fails like
    /// [`Execution::first_stdout_line`] when nothing was printed at all.
    pub fn combined_output(&self) -> Result<String> {
        let mut out = self.stdout.concat();
        out.push_str(&self.stderr.concat());
        if out.is_empty() {
            return Err(self.empty_output());
        }
        Ok(out)
    }

    fn empty_output(&self) -> Error {
        Error::EmptyExecutionOutput {
            error: self.error.as_ref().map(|e| format!("{}: {}", e.name, e.value)),
        }
    }
}

#[derive(Debug)]
pub struct SandboxClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    template: String,
    timeout_secs: u64,
    domain: String,
    execd_port: u64,
    exec_url_override: Option<String>,
}

impl SandboxClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let api_key = cfg.require("E2B_API_KEY")?;
        let api_url = cfg
            .get("E2B_API_URL")
            .unwrap_or_else(|| "https://api.e2b.dev".into())
            .trim_end_matches('/')
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout()))
            .build()
            .map_err(|e| Error::ExecutionRequestFailed(e.to_string()))?;

        Ok(Self {
            http,
            api_url,
            api_key,
            template: cfg.get("SANDBOX_TEMPLATE").unwrap_or_else(|| "code-interpreter-v1".into()),
            timeout_secs: cfg.get_u64("SANDBOX_TIMEOUT").unwrap_or(300),
            domain: cfg.get("E2B_DOMAIN").unwrap_or_else(|| "e2b.app".into()),
            execd_port: cfg.get_u64("E2B_EXECD_PORT").unwrap_or(49999),
            exec_url_override: cfg
                .get("SANDBOX_EXEC_URL")
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim_end_matches('/').to_string()),
        })
    }

    pub async fn create(&self) -> Result<Sandbox> {
        let url = format!("{}/sandboxes", self.api_url);
        let body = serde_json::json!({
            "templateID": self.template,
            "timeout": self.timeout_secs,
        });

        tracing::debug!(%url, template = %self.template, "creating sandbox");
        let resp = self
            .http
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ExecutionRequestFailed(format!("failed to create sandbox: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::ExecutionRequestFailed(format!(
                "sandbox creation failed: {} - {}",
                status, text
            )));
        }

        let created: CreatedSandbox = resp
            .json()
            .await
            .map_err(|e| Error::ExecutionRequestFailed(format!("malformed sandbox response: {e}")))?;

        let exec_url = match &self.exec_url_override {
            Some(u) => u.clone(),
            None => {
                let domain = created.domain.as_deref().unwrap_or(&self.domain);
                format!("https://{}-{}.{}", self.execd_port, created.sandbox_id, domain)
            }
        };
        tracing::info!(sandbox_id = %created.sandbox_id, "sandbox created");

        Ok(Sandbox {
            id: created.sandbox_id,
            access_token: created.envd_access_token,
            exec_url,
        })
    }

    pub fn run_code_stream(
        &self,
        sandbox: &Sandbox,
        code: &str,
        language: &str,
    ) -> Pin<Box<dyn Stream<Item = Result<ExecutionEvent>> + Send>> {
        let http = self.http.clone();
        let url = format!("{}/execute", sandbox.exec_url);
        let token = sandbox.access_token.clone();
        let body = serde_json::json!({ "code": code, "language": language });

        Box::pin(try_stream! {
            let mut req = http.post(&url).json(&body);
            if let Some(t) = &token {
                req = req.header("X-Access-Token", t);
            }
            let resp = req
                .send()
                .await
                .map_err(|e| Error::ExecutionRequestFailed(format!("failed to send code: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                Err(Error::ExecutionRequestFailed(format!("execution failed: {} - {}", status, text)))?;
                return;
            }

            let mut lines = LineBuffer::default();
            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let bytes = chunk
                    .map_err(|e| Error::ExecutionRequestFailed(format!("stream error: {e}")))?;
                for line in lines.push(&bytes) {
                    if let Some(ev) = parse_event(line.trim()) {
                        let done = ev == ExecutionEvent::EndOfExecution;
                        yield ev;
                        if done { return; }
                    }
                }
            }
            // last line without a trailing newline
            if let Some(line) = lines.finish() {
                if let Some(ev) = parse_event(line.trim()) {
                    yield ev;
                }
            }
        })
    }

    /// Run `code` and collect every event into an [`Execution`].
    pub async fn run_code(&self, sandbox: &Sandbox, code: &str, language: &str) -> Result<Execution> {
        let mut execution = Execution::default();
        let mut stream = self.run_code_stream(sandbox, code, language);
        while let Some(ev) = stream.next().await {
            execution.apply(ev?);
        }
        if let Some(err) = &execution.error {
            tracing::warn!(name = %err.name, value = %err.value, "code raised inside sandbox");
        }
        Ok(execution)
    }

    /// Run a shell command in the sandbox's bash kernel, e.g. to install a
    /// package the generated code needs. A command that fails (non-zero exit)
    /// is an [`Error::ExecutionRequestFailed`].
    pub async fn run_command(&self, sandbox: &Sandbox, cmd: &str) -> Result<Execution> {
        tracing::info!(sandbox_id = %sandbox.id, %cmd, "running setup command");
        let execution = self.run_code(sandbox, cmd, "bash").await?;
        if let Some(err) = &execution.error {
            return Err(Error::ExecutionRequestFailed(format!(
                "command `{}` failed: {}: {}",
                cmd, err.name, err.value
            )));
        }
        tracing::debug!(stdout = %execution.stdout.concat(), "setup command finished");
        Ok(execution)
    }

    /// Terminate the session. Failures are logged, not returned.
    pub async fn kill(&self, sandbox: &Sandbox) {
        let url = format!("{}/sandboxes/{}", self.api_url, sandbox.id);
        match self.http.delete(&url).header("X-API-Key", &self.api_key).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(sandbox_id = %sandbox.id, "sandbox killed")
            }
            Ok(resp) => {
                tracing::warn!(sandbox_id = %sandbox.id, status = %resp.status(), "sandbox kill rejected")
            }
            Err(e) => tracing::warn!(sandbox_id = %sandbox.id, error = %e, "sandbox kill failed"),
        }
    }
}

/// Splits a byte stream on `\n`, decoding only whole lines so multi-byte
/// characters cut across chunks survive.
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}

fn parse_event(line: &str) -> Option<ExecutionEvent> {
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<ExecutionEvent>(line) {
        Ok(ev) => Some(ev),
        Err(e) => {
            tracing::debug!(error = %e, %line, "skipping malformed execution event");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedSandbox {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "envdAccessToken", default)]
    envd_access_token: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

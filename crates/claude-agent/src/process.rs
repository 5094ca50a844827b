use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::types::{McpServerConfig, Message, PermissionMode, QueryOptions};
use crate::{ClaudeAgentError, Result};

const DEFAULT_EXECUTABLE: &str = "claude";

// ─── ClaudeProcess ────────────────────────────────────────────────────────

/// One `claude` run speaking stream-json on both stdin and stdout.
///
/// The user message is written to stdin, which is then closed; replies are
/// read back as JSONL. Stderr is collected in the background and attached to
/// the error if the process exits non-zero.
pub(crate) struct ClaudeProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    stderr_buf: Arc<Mutex<String>>,
}

impl ClaudeProcess {
    pub(crate) async fn spawn(prompt: &str, opts: &QueryOptions) -> Result<Self> {
        let exe = opts
            .path_to_executable
            .clone()
            .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string());
        let mut cmd = Command::new(&exe);
        cmd.args(build_args(opts));
        // Allow running from inside another Claude session.
        cmd.env_remove("CLAUDECODE");
        for (k, v) in &opts.env {
            cmd.env(k, v);
        }
        if let Some(cwd) = &opts.cwd {
            cmd.current_dir(cwd);
        }

        let mut process = Self::from_command(cmd).map_err(|e| match e {
            ClaudeAgentError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                ClaudeAgentError::NotInstalled(exe.clone())
            }
            other => other,
        })?;
        tracing::debug!(exe = %exe, resume = ?opts.resume, "claude process started");

        let user_msg = serde_json::json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "text", "text": prompt}]
            }
        });
        process.send_message(&user_msg).await?;
        process.close_stdin();

        Ok(process)
    }

    pub(crate) fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(ClaudeAgentError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClaudeAgentError::Process("stdout not captured".into()))?;
        let stdin = child.stdin.take();

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    if let Ok(mut b) = buf.lock() {
                        if !b.is_empty() {
                            b.push('\n');
                        }
                        b.push_str(&line);
                    }
                }
            });
        }

        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
            stdin,
            stderr_buf,
        })
    }

    async fn send_message(&mut self, msg: &serde_json::Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClaudeAgentError::Process("stdin already closed".into()))?;

        let mut buf = serde_json::to_vec(msg)
            .map_err(|e| ClaudeAgentError::Process(format!("failed to encode user message: {e}")))?;
        buf.push(b'\n');

        stdin.write_all(&buf).await?;
        stdin.flush().await?;
        Ok(())
    }

    fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Next message from stdout, `Ok(None)` at EOF.
    ///
    /// Lines whose `type` this crate does not model (partial chunks, tool
    /// progress, rate-limit notices) are skipped.
    pub(crate) async fn next_message(&mut self) -> Result<Option<Message>> {
        while let Some(line) = self.lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Message>(trimmed) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => {
                    if is_unmodelled_type(trimmed) {
                        tracing::trace!(line = trimmed, "skipping unmodelled message");
                        continue;
                    }
                    return Err(ClaudeAgentError::Parse {
                        line: trimmed.to_owned(),
                        source: e,
                    });
                }
            }
        }
        Ok(None)
    }

    /// Wait for exit; `Some(error)` for a non-zero status or a signal.
    pub(crate) async fn wait_exit_error(&mut self) -> Option<ClaudeAgentError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(ClaudeAgentError::Io(e)),
        };
        if status.success() {
            return None;
        }

        let stderr = self
            .stderr_buf
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default();
        let cause = match status.code() {
            Some(code) => format!("claude exited with code {code}"),
            None => "claude was terminated by a signal".to_string(),
        };
        let msg = if stderr.is_empty() {
            cause
        } else {
            format!("{cause}\nstderr: {stderr}")
        };
        Some(ClaudeAgentError::Process(msg))
    }

    pub(crate) async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// Valid JSON carrying a `type` tag we simply do not model.
fn is_unmodelled_type(line: &str) -> bool {
    const MODELLED: [&str; 4] = ["system", "assistant", "user", "result"];
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(str::to_owned))
        .map(|t| !MODELLED.contains(&t.as_str()))
        .unwrap_or(false)
}

// ─── Argument builder ─────────────────────────────────────────────────────

pub(crate) fn build_args(opts: &QueryOptions) -> Vec<String> {
    let mut args: Vec<String> = [
        "--print",
        "--output-format",
        "stream-json",
        "--verbose",
        "--input-format",
        "stream-json",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let mut flag = |name: &str, value: String| {
        args.push(name.to_string());
        args.push(value);
    };

    if let Some(model) = &opts.model {
        flag("--model", model.clone());
    }
    if let Some(max_turns) = opts.max_turns {
        flag("--max-turns", max_turns.to_string());
    }
    if let Some(budget) = opts.max_budget_usd {
        flag("--max-budget-usd", budget.to_string());
    }
    if opts.permission_mode != PermissionMode::Default {
        flag("--permission-mode", opts.permission_mode.as_str().to_string());
    }
    if let Some(sp) = &opts.system_prompt {
        flag("--system-prompt", sp.clone());
    }
    if let Some(append) = &opts.append_system_prompt {
        flag("--append-system-prompt", append.clone());
    }
    if let Some(resume) = &opts.resume {
        flag("--resume", resume.clone());
    }
    if !opts.mcp_servers.is_empty() {
        flag("--mcp-config", mcp_config_json(&opts.mcp_servers));
    }
    if !opts.allowed_tools.is_empty() {
        args.push("--allowed-tools".to_string());
        args.extend(opts.allowed_tools.iter().cloned());
    }

    args
}

/// `{"mcpServers":{"<name>":{"type":"stdio","command":…,"args":[…],"env":{…}}}}`
pub(crate) fn mcp_config_json(servers: &[McpServerConfig]) -> String {
    let mut mcp_servers = serde_json::Map::new();
    for srv in servers {
        let mut cfg = serde_json::json!({
            "type": "stdio",
            "command": srv.command,
        });
        if !srv.args.is_empty() {
            cfg["args"] = serde_json::json!(srv.args);
        }
        if !srv.env.is_empty() {
            cfg["env"] = serde_json::json!(srv.env);
        }
        mcp_servers.insert(srv.name.clone(), cfg);
    }
    serde_json::json!({ "mcpServers": mcp_servers }).to_string()
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn server() -> McpServerConfig {
        McpServerConfig {
            name: "komorebi".into(),
            command: "/usr/local/bin/komorebi".into(),
            args: vec!["--config".into(), "/home/me/config/settings.yaml".into(), "mcp".into()],
            env: HashMap::new(),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn default_args_only_select_the_protocol() {
        let args = build_args(&QueryOptions::default());
        assert_eq!(value_after(&args, "--output-format"), Some("stream-json"));
        assert_eq!(value_after(&args, "--input-format"), Some("stream-json"));
        assert!(!args.iter().any(|a| a == "--model" || a == "--resume"));
    }

    #[test]
    fn options_become_flags() {
        let opts = QueryOptions {
            model: Some("claude-sonnet-4-5-20250929".into()),
            max_budget_usd: Some(0.5),
            resume: Some("sess-1".into()),
            permission_mode: PermissionMode::DontAsk,
            mcp_servers: vec![server()],
            allowed_tools: vec!["mcp__komorebi__list_projects".into(), "mcp__komorebi__plan_today".into()],
            ..Default::default()
        };
        let args = build_args(&opts);
        assert_eq!(value_after(&args, "--model"), Some("claude-sonnet-4-5-20250929"));
        assert_eq!(value_after(&args, "--max-budget-usd"), Some("0.5"));
        assert_eq!(value_after(&args, "--resume"), Some("sess-1"));
        assert_eq!(value_after(&args, "--permission-mode"), Some("dontAsk"));
        // Allowed tools are variadic, so they come last.
        let at = args.iter().position(|a| a == "--allowed-tools").unwrap();
        assert_eq!(args.len(), at + 3);
    }

    #[test]
    fn mcp_config_shape() {
        let json: serde_json::Value = serde_json::from_str(&mcp_config_json(&[server()])).unwrap();
        let srv = &json["mcpServers"]["komorebi"];
        assert_eq!(srv["type"], "stdio");
        assert_eq!(srv["command"], "/usr/local/bin/komorebi");
        assert_eq!(srv["args"][2], "mcp");
        assert!(srv.get("env").is_none());
    }

    #[test]
    fn unmodelled_types_are_recognised() {
        assert!(is_unmodelled_type(r#"{"type":"rate_limit_event"}"#));
        assert!(!is_unmodelled_type(r#"{"type":"result","subtype":123}"#));
        assert!(!is_unmodelled_type("not json"));
    }
}

//! Tool rewriting for AI API request bodies.
//!
//! A coding agent pointed at a remote machine must not be offered its local
//! filesystem tools, which would act on the wrong host. The interceptor
//! here rewrites a request body in flight: local execution tools are
//! removed from the `tools` array, a remote-shell tool is appended, and the
//! working-directory line of the system prompt is repointed at the remote
//! machine. The driving layer composes with [`RequestInterceptor`]
//! explicitly; nothing process-wide is patched.

use serde_json::{Value, json};

/// Local tools that act on the bridge host's filesystem and must not reach
/// the model while a remote session is active.
pub const EXCLUDED_TOOLS: [&str; 4] = ["Bash", "Grep", "Glob", "LS"];

/// Name of the tool injected in their place.
pub const REMOTE_SHELL_TOOL: &str = "RemoteShell";

/// Transforms outbound AI API request bodies.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, body: Value) -> Value;
}

/// Rewrites tool lists and system prompts for a remote session.
pub struct ShellToolInterceptor {
    remote_cwd: String,
}

impl ShellToolInterceptor {
    pub fn new(remote_cwd: impl Into<String>) -> Self {
        Self {
            remote_cwd: remote_cwd.into(),
        }
    }
}

impl RequestInterceptor for ShellToolInterceptor {
    fn intercept(&self, mut body: Value) -> Value {
        if let Some(tools) = body.get_mut("tools").and_then(Value::as_array_mut) {
            rewrite_tools(tools, &self.remote_cwd);
        }
        if let Some(system) = body.get_mut("system") {
            *system = rewrite_system(system.take(), &self.remote_cwd);
        }
        body
    }
}

/// The remote-shell tool definition offered to the model.
pub fn remote_shell_tool(remote_cwd: &str) -> Value {
    json!({
        "name": REMOTE_SHELL_TOOL,
        "description": format!(
            "Execute a shell command on the remote machine.\n\
             \n\
             Working directory: {remote_cwd}\n\
             \n\
             Commands run in the remote machine's native shell. Use it for \
             everything you would otherwise do with local file tools: \
             listing and reading files, searching, creating directories, \
             copying, moving, and deleting. Output is returned as stdout, \
             stderr, and an exit code."
        ),
        "input_schema": {
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                }
            },
            "required": ["command"]
        }
    })
}

/// Drops local execution tools and appends the remote-shell tool.
fn rewrite_tools(tools: &mut Vec<Value>, remote_cwd: &str) {
    tools.retain(|tool| {
        tool.get("name")
            .and_then(Value::as_str)
            .is_none_or(|name| !EXCLUDED_TOOLS.contains(&name))
    });
    tools.push(remote_shell_tool(remote_cwd));
}

/// Repoints any `Working directory:` line at the remote machine.
///
/// System prompts arrive either as a plain string or as an array of text
/// blocks; both forms are handled, anything else passes through untouched.
fn rewrite_system(system: Value, remote_cwd: &str) -> Value {
    match system {
        Value::String(text) => Value::String(rewrite_cwd_line(&text, remote_cwd)),
        Value::Array(blocks) => Value::Array(
            blocks
                .into_iter()
                .map(|mut block| {
                    if let Some(text) = block.get("text").and_then(Value::as_str) {
                        let rewritten = rewrite_cwd_line(text, remote_cwd);
                        block["text"] = Value::String(rewritten);
                    }
                    block
                })
                .collect(),
        ),
        other => other,
    }
}

fn rewrite_cwd_line(text: &str, remote_cwd: &str) -> String {
    if !text.contains("Working directory:") {
        return text.to_owned();
    }
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        if line.trim_start().starts_with("Working directory:") {
            lines.push(format!("Working directory: {remote_cwd}"));
        } else {
            lines.push(line.to_owned());
        }
    }
    lines.join("\n")
}

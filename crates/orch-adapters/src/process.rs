//! Shared subprocess plumbing for the CLI-backed step executors
//! (`terraform`, `kubernetes`, `ansible`). Every step that shells out
//! funnels through `run`, so exit-code and stdout/stderr handling stays
//! consistent.

use std::collections::HashMap;
use std::process::Stdio;

use orch_core::OrchError;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct ProcessSpec<'a> {
    pub program: &'a str,
    pub args: Vec<String>,
    pub cwd: Option<&'a str>,
    pub env: HashMap<String, String>,
    pub stdin: Option<String>,
}

pub async fn run(spec: ProcessSpec<'_>) -> Result<Value, OrchError> {
    let mut command = Command::new(spec.program);
    command.args(&spec.args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if spec.stdin.is_some() {
        command.stdin(Stdio::piped());
    }
    if let Some(cwd) = spec.cwd {
        command.current_dir(cwd);
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    let mut child = command.spawn()
                            .map_err(|e| OrchError::External(format!("spawning '{}': {e}", spec.program)))?;

    if let Some(input) = spec.stdin {
        let mut stdin = child.stdin.take().expect("stdin requested via Stdio::piped");
        stdin.write_all(input.as_bytes())
             .await
             .map_err(|e| OrchError::External(format!("writing stdin to '{}': {e}", spec.program)))?;
        drop(stdin);
    }

    let output = child.wait_with_output()
                       .await
                       .map_err(|e| OrchError::External(format!("waiting on '{}': {e}", spec.program)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    if !output.status.success() {
        return Err(OrchError::External(format!("'{}' exited with {exit_code}: {stderr}", spec.program)));
    }

    Ok(json!({ "stdout": stdout, "stderr": stderr, "exit_code": exit_code }))
}

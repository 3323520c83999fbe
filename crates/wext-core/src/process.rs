//! JSON-over-stdio bridge to external programs.
//!
//! The command loader and the command bundler both spawn a configured
//! program, write one JSON request to its stdin and read one JSON response
//! from its stdout.

use std::io;
use std::path::Path;
use std::process::Stdio;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Run `command` in `cwd`, send `request`, parse stdout as `R`.
///
/// Failures are returned as a human-readable message; callers wrap it in the
/// error type of their stage.
pub(crate) async fn run_json<Q, R>(command: &[String], cwd: &Path, request: &Q) -> Result<R, String>
where
    Q: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let (program, args) = command
        .split_first()
        .ok_or_else(|| "no command configured".to_string())?;

    let payload = serde_json::to_vec(request).map_err(|e| format!("invalid request: {e}"))?;
    debug!("Running {} ({} byte request)", command.join(" "), payload.len());

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("failed to spawn `{program}`: {e}"))?;

    // stdin is fed while stdout and stderr are drained.
    let writer = child.stdin.take().map(|mut stdin| {
        tokio::spawn(async move {
            match stdin.write_all(&payload).await {
                // The child is free to exit without reading its input.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                result => result,
            }
            // Dropping stdin closes the pipe so the child sees EOF.
        })
    });

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| format!("failed to wait for `{program}`: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |code| code.to_string());
        return Err(format!("`{program}` exited with {code}: {}", stderr.trim()));
    }

    if let Some(writer) = writer {
        writer
            .await
            .map_err(|e| format!("request writer for `{program}` stopped: {e}"))?
            .map_err(|e| format!("failed to write request to `{program}`: {e}"))?;
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| format!("`{program}` returned invalid JSON: {e}"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[tokio::test]
    async fn echoes_json() {
        let dir = tempfile::tempdir().unwrap();
        let response: Value = run_json(&sh("cat"), dir.path(), &json!({ "a": 1 }))
            .await
            .unwrap();
        assert_eq!(response, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_json::<_, Value>(&sh("cat >/dev/null; echo nope >&2; exit 3"), dir.path(), &json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("exited with 3"), "{err}");
        assert!(err.contains("nope"), "{err}");
    }

    #[tokio::test]
    async fn child_may_exit_without_reading_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let request = json!({ "data": "x".repeat(1 << 20) });
        let response: Value = run_json(&sh("echo '{\"ok\": true}'"), dir.path(), &request)
            .await
            .unwrap();
        assert_eq!(response, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn large_output_before_reading_input_completes() {
        let dir = tempfile::tempdir().unwrap();
        let request = json!({ "data": "x".repeat(1 << 20) });
        // Writes well past a pipe buffer to stdout before touching stdin.
        let script = "head -c 300000 /dev/zero | tr '\\0' ' '; printf '{\"done\": 1}'; cat >/dev/null";
        let response: Value = tokio::time::timeout(
            Duration::from_secs(30),
            run_json(&sh(script), dir.path(), &request),
        )
        .await
        .expect("child and parent should not wait on each other")
        .unwrap();
        assert_eq!(response, json!({ "done": 1 }));
    }

    #[tokio::test]
    async fn empty_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_json::<_, Value>(&[], dir.path(), &json!({})).await.unwrap_err();
        assert_eq!(err, "no command configured");
    }
}

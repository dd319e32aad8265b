use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// The captured result of one external-tool invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

fn build_command(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    envs: &[(String, String)],
) -> Command {
    let mut command = Command::new(program);
    command.args(args);

    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    // Process state crosses into the child only here, at the spawn boundary.
    for (key, value) in envs {
        command.env(key, value);
    }

    command
}

/// Run to completion and capture exit status, stdout and stderr.
pub async fn run_captured(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    envs: &[(String, String)],
) -> anyhow::Result<CommandOutput> {
    tracing::debug!("Running {} {:?}", program, args);

    let output = build_command(program, args, cwd, envs).output().await?;

    Ok(CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run to completion, piping the child's stdout and stderr line-by-line to
/// our own. Used for long-running tool invocations where the user wants to
/// watch progress.
pub async fn run_streamed(
    name: &str,
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    envs: &[(String, String)],
) -> anyhow::Result<ExitStatus> {
    tracing::debug!("Running {} {:?}", program, args);

    let mut child = build_command(program, args, cwd, envs)
        .kill_on_drop(true)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("Failed to capture {name} stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("Failed to capture {name} stderr"))?;

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();

    let name_owned = name.to_string();
    let stdout_task = tokio::spawn(async move {
        while let Some(line) = stdout_reader.next_line().await.unwrap_or(None) {
            println!("{name_owned}: {line}");
        }
    });

    let name_owned = name.to_string();
    let stderr_task = tokio::spawn(async move {
        while let Some(line) = stderr_reader.next_line().await.unwrap_or(None) {
            eprintln!("{name_owned}: {line}");
        }
    });

    let status = child.wait().await?;

    let _ = stdout_task.await;
    let _ = stderr_task.await;

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let output = run_captured("echo", &["hello"], None, &[]).await.unwrap();

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn envs_cross_only_at_spawn() {
        let output = run_captured(
            "sh",
            &["-c", "printf %s \"$PROBE_VAR\""],
            None,
            &[("PROBE_VAR".to_string(), "value".to_string())],
        )
        .await
        .unwrap();

        assert_eq!(output.stdout, "value");
        assert!(std::env::var("PROBE_VAR").is_err());
    }

    #[tokio::test]
    async fn missing_binary_is_an_error() {
        assert!(run_captured("definitely-not-a-binary", &[], None, &[])
            .await
            .is_err());
    }
}

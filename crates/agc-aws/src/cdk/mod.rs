//! CDK application deployment

mod progress;

pub use progress::{
    parse_step_line, OutputLines, ProgressEvent, ProgressStream, StepProgress,
    FAILURE_OUTPUT_TAIL, PROGRESS_CHANNEL_CAPACITY,
};

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Deploys a CDK application and reports progress as it goes.
#[async_trait]
pub trait DeploymentService: Send + Sync {
    /// `env` entries are `KEY=VALUE` strings added to the tool's environment.
    async fn deploy_app(&self, app_dir: &Path, env: Vec<String>) -> Result<ProgressStream>;
}

/// Runs `cdk deploy` for an application through its npm scripts
pub struct CdkClient {
    command: String,
    profile: Option<String>,
}

impl CdkClient {
    pub fn new(command: impl Into<String>, profile: Option<String>) -> Self {
        Self {
            command: command.into(),
            profile,
        }
    }

    fn deploy_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["run", "cdk", "deploy", "--", "--all"]
            .iter()
            .map(|arg| arg.to_string())
            .collect();
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args.extend(
            ["--require-approval", "never", "--progress", "events"]
                .iter()
                .map(|arg| arg.to_string()),
        );
        args
    }
}

#[async_trait]
impl DeploymentService for CdkClient {
    async fn deploy_app(&self, app_dir: &Path, env: Vec<String>) -> Result<ProgressStream> {
        if !app_dir.is_dir() {
            return Err(Error::config(format!(
                "CDK application directory '{}' does not exist",
                app_dir.display()
            )));
        }

        let args = self.deploy_args();
        debug!(
            app_dir = %app_dir.display(),
            command = %self.command,
            args = ?args,
            "Starting CDK deployment"
        );

        let mut child = Command::new(&self.command)
            .args(&args)
            .current_dir(app_dir)
            .envs(env.iter().filter_map(|entry| entry.split_once('=')))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::deployment(format!("failed to start '{}': {}", self.command, e), vec![])
            })?;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, line_tx));
        }

        let (tx, stream) = ProgressStream::channel();
        tokio::spawn(async move {
            let outputs = publish_lines(line_rx, &tx).await;

            let failure = match child.wait().await {
                Ok(status) if status.success() => None,
                Ok(status) => Some(format!("cdk deploy exited with {}", status)),
                Err(e) => Some(format!("failed to wait for cdk deploy: {}", e)),
            };
            if let Some(message) = failure {
                let err = Error::deployment(message, outputs.to_vec());
                if tx.send(ProgressEvent::failed(err, outputs)).await.is_err() {
                    warn!("Deployment failed after the progress consumer went away");
                }
            }
        });

        Ok(stream)
    }
}

/// Forward each output line until EOF. Bytes that are not UTF-8 are
/// replaced rather than ending the read, so the pipe stays drained.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                // Receiver gone: keep reading so the child never sees a closed pipe
                let _ = tx.send(line.to_string());
            }
            Err(e) => {
                warn!(error = %e, "Failed to read CDK output");
                break;
            }
        }
    }
}

/// Turn raw output lines into progress events. Returns all lines seen.
async fn publish_lines(
    mut lines: mpsc::UnboundedReceiver<String>,
    tx: &mpsc::Sender<ProgressEvent>,
) -> OutputLines {
    let mut outputs = OutputLines::default();
    let mut current_step = 0;
    let mut total_steps = 0;
    let mut step_description = String::new();
    let mut consumer_gone = false;

    while let Some(line) = lines.recv().await {
        if let Some(step) = parse_step_line(&line) {
            current_step = step.current;
            total_steps = step.total;
            step_description = step.description;
        }
        outputs.push(line);

        // Keep draining so the child never blocks on a full pipe
        if consumer_gone {
            continue;
        }
        let event = ProgressEvent {
            outputs: outputs.clone(),
            current_step,
            total_steps,
            step_description: step_description.clone(),
            err: None,
        };
        if tx.send(event).await.is_err() {
            consumer_gone = true;
        }
    }

    outputs
}

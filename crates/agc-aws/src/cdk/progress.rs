//! Deployment progress events and their consumers

use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tracing::error;

use crate::{Error, Result};

/// Capacity of the channel between the CDK reader and the consumer
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Number of trailing output lines shown when a summarised deployment fails
pub const FAILURE_OUTPUT_TAIL: usize = 20;

// "AgcCore |  3/12 | 10:31:24 AM | CREATE_COMPLETE | AWS::S3::Bucket | Bucket"
static STEP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<stack>[^|\s]+)\s*\|\s*(?P<current>\d+)\s*/\s*(?P<total>\d+)\s*\|(?P<detail>.*)$")
        .expect("step line regex is valid")
});

/// Output lines of a deployment up to some point in time.
///
/// Every snapshot shares one append-only buffer with the writer and only
/// records how many lines it covers, so taking one per line stays cheap.
#[derive(Debug, Clone, Default)]
pub struct OutputLines {
    shared: Arc<RwLock<Vec<String>>>,
    len: usize,
}

impl OutputLines {
    /// Append a line. Only the writer side calls this, on its own handle.
    pub(crate) fn push(&mut self, line: String) {
        let mut lines = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        lines.truncate(self.len);
        lines.push(line);
        self.len = lines.len();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.tail(self.len)
    }

    /// The last `count` lines of this snapshot, oldest first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let lines = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        lines[self.len.saturating_sub(count)..self.len].to_vec()
    }
}

impl From<Vec<String>> for OutputLines {
    fn from(lines: Vec<String>) -> Self {
        Self {
            len: lines.len(),
            shared: Arc::new(RwLock::new(lines)),
        }
    }
}

/// One update from a running deployment
#[derive(Debug, Clone, Default)]
pub struct ProgressEvent {
    /// Every output line seen so far
    pub outputs: OutputLines,
    pub current_step: u64,
    pub total_steps: u64,
    pub step_description: String,
    /// Set on the final event of a failed deployment
    pub err: Option<Error>,
}

impl ProgressEvent {
    pub fn failed(err: Error, outputs: impl Into<OutputLines>) -> Self {
        Self {
            outputs: outputs.into(),
            err: Some(err),
            ..Default::default()
        }
    }
}

/// Step counter parsed from a CDK `--progress events` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepProgress {
    pub stack: String,
    pub current: u64,
    pub total: u64,
    pub description: String,
}

pub fn parse_step_line(line: &str) -> Option<StepProgress> {
    let caps = STEP_LINE.captures(line)?;
    let current = caps["current"].parse().ok()?;
    let total = caps["total"].parse().ok()?;

    // First column after the counter is the timestamp
    let fields: Vec<&str> = caps["detail"]
        .split('|')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect();
    let description = if fields.len() > 1 {
        fields[1..].join(" ")
    } else {
        fields.join(" ")
    };

    Some(StepProgress {
        stack: caps["stack"].to_string(),
        current,
        total,
        description,
    })
}

/// Live sequence of events from a deployment. Not restartable.
pub struct ProgressStream {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl ProgressStream {
    pub fn new(rx: mpsc::Receiver<ProgressEvent>) -> Self {
        Self { rx }
    }

    /// Sender/stream pair backed by a bounded channel
    pub fn channel() -> (mpsc::Sender<ProgressEvent>, Self) {
        let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        (tx, Self::new(rx))
    }

    /// Next event, or `None` once the deployment has finished.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Render a progress bar labelled `label` until the stream closes.
    /// Returns the first error carried by an event, after logging the last
    /// lines of deployment output.
    pub async fn display_progress(mut self, label: &str) -> Result<()> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_prefix(label.to_string());

        while let Some(event) = self.next_event().await {
            if let Some(err) = event.err {
                pb.abandon_with_message("failed");
                for line in event.outputs.tail(FAILURE_OUTPUT_TAIL) {
                    error!("{}", line);
                }
                return Err(err);
            }
            if event.total_steps > 0 {
                pb.set_length(event.total_steps);
                pb.set_position(event.current_step);
            }
            if !event.step_description.is_empty() {
                pb.set_message(event.step_description);
            }
            pb.tick();
        }

        pb.finish_with_message("done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step_line() {
        let line = " Agc-Core |  3/12 | 10:31:24 AM | CREATE_COMPLETE      | AWS::S3::Bucket | Bucket (Bucket83908E77)";
        let step = parse_step_line(line).unwrap();
        assert_eq!(step.stack, "Agc-Core");
        assert_eq!(step.current, 3);
        assert_eq!(step.total, 12);
        assert_eq!(
            step.description,
            "CREATE_COMPLETE AWS::S3::Bucket Bucket (Bucket83908E77)"
        );
    }

    #[test]
    fn test_parse_ignores_plain_output() {
        assert!(parse_step_line("Agc-Core: deploying...").is_none());
        assert!(parse_step_line("").is_none());
        assert!(parse_step_line(" ✅  Agc-Core").is_none());
    }

    #[tokio::test]
    async fn test_display_progress_success() {
        let (tx, stream) = ProgressStream::channel();
        tokio::spawn(async move {
            for step in 1..=3 {
                let event = ProgressEvent {
                    outputs: vec![format!("line {}", step)].into(),
                    current_step: step,
                    total_steps: 3,
                    step_description: format!("step {}", step),
                    err: None,
                };
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });

        assert!(stream.display_progress("Activating account...").await.is_ok());
    }

    #[tokio::test]
    async fn test_display_progress_returns_first_error() {
        let (tx, stream) = ProgressStream::channel();
        tx.send(ProgressEvent::default()).await.unwrap();
        tx.send(ProgressEvent::failed(
            Error::deployment("stack rolled back", vec!["UPDATE_ROLLBACK".to_string()]),
            Vec::<String>::new(),
        ))
        .await
        .unwrap();
        tx.send(ProgressEvent::failed(Error::config("later"), Vec::<String>::new()))
            .await
            .unwrap();
        drop(tx);

        let err = stream.display_progress("Activating account...").await.unwrap_err();
        assert!(matches!(err, Error::Deployment { ref message, .. } if message == "stack rolled back"));
    }

    #[test]
    fn test_output_snapshots_share_one_buffer() {
        let mut log = OutputLines::default();
        log.push("one".to_string());
        let first = log.clone();
        log.push("two".to_string());
        log.push("three".to_string());

        assert_eq!(first.to_vec(), vec!["one"]);
        assert_eq!(log.len(), 3);
        assert_eq!(log.tail(2), vec!["two", "three"]);
        assert_eq!(log.tail(10), vec!["one", "two", "three"]);
        assert!(Arc::ptr_eq(&first.shared, &log.shared));
        assert!(OutputLines::default().is_empty());
    }

    #[tokio::test]
    async fn test_display_progress_logs_output_tail_on_failure() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let lines: Vec<String> = (1..=25).map(|n| format!("cdk line {}", n)).collect();
        let (tx, stream) = ProgressStream::channel();
        tx.send(ProgressEvent::failed(
            Error::deployment("cdk deploy exited with exit status: 1", lines.clone()),
            lines,
        ))
        .await
        .unwrap();
        drop(tx);

        assert!(stream.display_progress("Activating account...").await.is_err());

        let logged = buf.contents();
        let replayed: Vec<&str> = logged
            .lines()
            .filter_map(|line| line.trim_start().strip_prefix("ERROR "))
            .map(str::trim)
            .collect();
        let expected: Vec<String> = (6..=25).map(|n| format!("cdk line {}", n)).collect();
        assert_eq!(replayed, expected);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}

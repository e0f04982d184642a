// SPDX-License-Identifier: MIT
// Single-consumer result sink: counts successes and appends to an output file.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::model::ScanResult;

pub enum OutputFormat {
    Plain,
    Json,
}

struct Writer {
    file: BufWriter<tokio::fs::File>,
    format: OutputFormat,
}

/// Owns the optional output file and the success counter. Cloning is cheap —
/// every clone shares the same counter and (if present) the same writer.
#[derive(Clone)]
pub struct ResultSink {
    count: Arc<AtomicU64>,
    writer: Option<Arc<Mutex<Writer>>>,
}

impl ResultSink {
    pub async fn new(output_path: Option<&str>, format: OutputFormat) -> Result<Self, crate::error::ScanError> {
        let writer = match output_path {
            Some(path) => {
                let file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await
                    .map_err(crate::error::ScanError::from)?;
                Some(Arc::new(Mutex::new(Writer {
                    file: BufWriter::new(file),
                    format,
                })))
            }
            None => None,
        };
        Ok(Self {
            count: Arc::new(AtomicU64::new(0)),
            writer,
        })
    }

    pub fn success_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    async fn record(&self, result: &ScanResult) -> Result<(), crate::error::ScanError> {
        self.count.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            protocol = %result.protocol,
            target = %result.original_target,
            port = result.port,
            username = %result.username,
            "SUCCESS"
        );

        if let Some(writer) = &self.writer {
            let mut guard = writer.lock().await;
            let line = match guard.format {
                OutputFormat::Plain => format!(
                    "[{}] {}:{} [{}] [{}]\n",
                    result.protocol, result.ip, result.port, result.username, result.password
                ),
                OutputFormat::Json => format!("{}\n", serde_json::to_string(result)?),
            };
            guard.file.write_all(line.as_bytes()).await.map_err(crate::error::ScanError::from)?;
            guard.file.flush().await.map_err(crate::error::ScanError::from)?;
        }
        Ok(())
    }

    /// Spawns the consumer task. The caller holds `rx` until the scheduler has
    /// closed every producing sender, then awaits the returned handle so every
    /// success is flushed before the process exits.
    pub fn spawn(self, mut rx: mpsc::Receiver<ScanResult>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                if let Err(e) = self.record(&result).await {
                    tracing::error!(%e, "failed to write result to output sink");
                }
            }
        })
    }
}

impl From<serde_json::Error> for crate::error::ScanError {
    fn from(e: serde_json::Error) -> Self {
        crate::error::ScanError::protocol(format!("json encoding failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Credential, Encryption, Protocol, Target};

    fn sample_result() -> ScanResult {
        let target = Target {
            ip: "192.0.2.5".parse().unwrap(),
            port: 22,
            encryption: Encryption::Plain,
            original_target: "192.0.2.5".into(),
        };
        let cred = Credential {
            username: "root".into(),
            password: "toor".into(),
        };
        ScanResult::new(Protocol::Ssh, &target, &cred)
    }

    #[tokio::test]
    async fn plain_text_line_matches_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let sink = ResultSink::new(Some(path.to_str().unwrap()), OutputFormat::Plain)
            .await
            .unwrap();
        sink.record(&sample_result()).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "[ssh] 192.0.2.5:22 [root] [toor]\n");
        assert_eq!(sink.success_count(), 1);
    }

    #[tokio::test]
    async fn json_line_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let sink = ResultSink::new(Some(path.to_str().unwrap()), OutputFormat::Json)
            .await
            .unwrap();
        sink.record(&sample_result()).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed["protocol"], "ssh");
        assert_eq!(parsed["username"], "root");
        assert_eq!(parsed["target"], "192.0.2.5");
        assert!(parsed.get("ip").is_none());
        assert!(parsed.get("original_target").is_none());
    }

    #[tokio::test]
    async fn without_output_path_only_counts() {
        let sink = ResultSink::new(None, OutputFormat::Plain).await.unwrap();
        sink.record(&sample_result()).await.unwrap();
        assert_eq!(sink.success_count(), 1);
    }
}

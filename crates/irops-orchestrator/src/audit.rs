use chrono::{DateTime, Utc};
use irops_core::JobId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// One line of `audit.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub disruption_id: JobId,
    pub action: String,
    pub success: bool,
    pub agents_involved: usize,
    pub phases_completed: usize,
    pub errors: Vec<String>,
    pub details: serde_json::Value,
}

enum Command {
    Write(Box<AuditEntry>),
    Flush(oneshot::Sender<()>),
}

/// Append-only audit log of coordination runs.
///
/// Entries are written by a background task in the order they were logged.
/// Write failures are reported through `tracing` and never reach the caller.
#[derive(Clone)]
pub struct AuditLog {
    tx: mpsc::UnboundedSender<Command>,
}

impl AuditLog {
    /// Spawns the writer task. Must be called inside a Tokio runtime.
    pub fn new(log_dir: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();

        tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&log_dir).await {
                warn!(dir = %log_dir.display(), error = %e, "Failed to create audit directory");
            }
            let log_file = log_dir.join("audit.jsonl");

            while let Some(command) = rx.recv().await {
                match command {
                    Command::Write(entry) => {
                        let line = match serde_json::to_string(&entry) {
                            Ok(line) => format!("{line}\n"),
                            Err(e) => {
                                warn!(error = %e, "Failed to serialize audit entry");
                                continue;
                            }
                        };
                        let written = async {
                            let mut file = tokio::fs::OpenOptions::new()
                                .create(true)
                                .append(true)
                                .open(&log_file)
                                .await?;
                            file.write_all(line.as_bytes()).await?;
                            file.flush().await
                        }
                        .await;
                        if let Err(e) = written {
                            warn!(file = %log_file.display(), error = %e, "Failed to write audit entry");
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn log(&self, entry: AuditEntry) {
        info!(
            disruption_id = entry.disruption_id,
            action = %entry.action,
            success = entry.success,
            agents_involved = entry.agents_involved,
            phases_completed = entry.phases_completed,
            errors = ?entry.errors,
            "audit"
        );
        if self.tx.send(Command::Write(Box::new(entry))).is_err() {
            warn!("Audit writer stopped; entry dropped");
        }
    }

    /// Resolves once every entry logged before the call has been written.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

//! Executor child process speaking the JSON wire format over stdio.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::{TransportError, TransportResult};
use super::{decode_response, encode_request, QueryTransport, ResultSet};
use crate::config::{Settings, SettingsError};

/// Runs one executor process per batch.
///
/// The batch is written to the child's stdin as a JSON array of statements
/// and stdin is closed; the child answers on stdout with one result set per
/// statement and exits. A non-zero exit status is an executor failure
/// carrying the child's stderr.
///
/// ```ignore
/// use panelql::transport::{ProcessTransport, QueryTransport};
///
/// let transport = ProcessTransport::new("duckdb-exec").with_args(["data.ddb"]);
/// let results = transport.execute(&["SELECT 42".to_string()]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProcessTransport {
    command: PathBuf,
    args: Vec<String>,
}

impl ProcessTransport {
    pub fn new<P: AsRef<Path>>(command: P) -> Self {
        Self {
            command: command.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Build from the `[transport]` settings section, expanding env vars.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let command = settings.transport.resolved_command()?;
        let args = settings.transport.resolved_args()?;
        Ok(Self::new(command).with_args(args))
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait(?Send)]
impl QueryTransport for ProcessTransport {
    async fn execute(&self, statements: &[String]) -> TransportResult<Vec<ResultSet>> {
        let request = encode_request(statements)?;

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::warn!(command = %self.command.display(), error = %e, "failed to spawn executor");
                TransportError::SpawnFailed(e)
            })?;

        tracing::debug!(
            command = %self.command.display(),
            statements = statements.len(),
            "executing batch"
        );

        // An executor that exits early breaks the pipe; its exit status and
        // stderr take precedence over the write error.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&request).await,
            None => Ok(()),
        };
        // Dropping stdin closed the pipe so the executor sees EOF

        let output = child
            .wait_with_output()
            .await
            .map_err(TransportError::ReadFailed)?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(status = %output.status, message = %message, "executor failed");
            return Err(TransportError::executor(output.status.to_string(), message));
        }
        written.map_err(TransportError::WriteFailed)?;

        decode_response(&output.stdout, statements.len())
    }
}

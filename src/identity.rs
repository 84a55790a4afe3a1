use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SyncError};

/// Source of bearer tokens
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Obtain a token. `interactive` allows the provider to prompt the user.
    async fn get_auth_token(&self, interactive: bool) -> Result<String>;
}

/// A token handed over up front (flag or environment)
pub struct StaticIdentity {
    token: String,
}

impl StaticIdentity {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn get_auth_token(&self, _interactive: bool) -> Result<String> {
        if self.token.trim().is_empty() {
            return Err(SyncError::auth("No token received"));
        }
        Ok(self.token.trim().to_string())
    }
}

/// Runs an external command and takes its stdout as the token,
/// e.g. `gcloud auth print-access-token`
pub struct CommandIdentity {
    program: String,
    args: Vec<String>,
}

impl CommandIdentity {
    /// Build from an argv list; `None` when the list is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl IdentityProvider for CommandIdentity {
    async fn get_auth_token(&self, interactive: bool) -> Result<String> {
        debug!(program = %self.program, interactive, "requesting token");

        let mut command = Command::new(&self.program);
        command.args(&self.args).stdout(Stdio::piped());
        if interactive {
            command.stdin(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdin(Stdio::null()).stderr(Stdio::piped());
        }

        let output = command.output().await.map_err(|e| {
            SyncError::auth(format!(
                "Identity command {} is not available: {}",
                self.program, e
            ))
        })?;

        if !output.status.success() {
            return Err(SyncError::auth(sign_in_failure(
                output.status,
                &output.stderr,
                interactive,
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(SyncError::auth("No token received"));
        }
        Ok(token)
    }
}

/// Message for a failed identity command. Interactive runs already showed
/// their stderr on the terminal, so only the exit status is left to report.
fn sign_in_failure(status: std::process::ExitStatus, stderr: &[u8], interactive: bool) -> String {
    if interactive {
        return format!("Sign-in failed ({}); see the output above", status);
    }

    let stderr = String::from_utf8_lossy(stderr);
    match stderr.trim() {
        "" => format!("Sign-in failed ({})", status),
        detail => format!("Sign-in failed: {}", detail),
    }
}

/// Used when nothing is configured to hand out tokens
pub struct Unavailable;

#[async_trait]
impl IdentityProvider for Unavailable {
    async fn get_auth_token(&self, _interactive: bool) -> Result<String> {
        Err(SyncError::auth(
            "Identity provider not available. Pass --token, set TODOSHEETS_TOKEN or configure token_command.",
        ))
    }
}

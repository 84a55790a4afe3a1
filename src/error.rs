use thiserror::Error;

/// Errors raised by the synchronizer, its backends and the weather lookup
#[derive(Debug, Error)]
pub enum SyncError {
    /// Identity capability missing, sign-in declined, or no token returned
    #[error("{0}")]
    Auth(String),

    /// The provider rejected the bearer credential (HTTP 401)
    #[error("{message}")]
    Unauthorized { message: String },

    /// Any other non-2xx response
    #[error("{message}")]
    Remote { status: u16, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("No sheet selected")]
    NoSheetSelected,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid range {range:?}: {reason}")]
    Range { range: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    pub fn auth(msg: impl Into<String>) -> Self {
        SyncError::Auth(msg.into())
    }

    /// Build the error for a failed HTTP exchange. 401 is kept apart so the
    /// re-authentication policy can react to it.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 401 {
            SyncError::Unauthorized { message }
        } else {
            SyncError::Remote { status, message }
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SyncError::Unauthorized { .. })
    }
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(e: serde_yaml::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_splits_unauthorized() {
        assert!(SyncError::from_status(401, "Invalid Credentials").is_unauthorized());

        let err = SyncError::from_status(404, "Requested entity was not found.");
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "Requested entity was not found.");
    }
}

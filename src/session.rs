use tracing::info;

use crate::error::Result;
use crate::store::{KeyValueStore, AUTH_TOKEN_KEY, SPREADSHEET_ID_KEY};
use crate::types::SessionState;

/// Credential and sheet selection for the current user.
///
/// Loaded from a [`KeyValueStore`] when a command starts and saved back when
/// it ends; in between it is passed explicitly to whatever needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credential: Option<String>,
    spreadsheet_id: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(store: &dyn KeyValueStore) -> Result<Self> {
        let mut values = store.get(&[AUTH_TOKEN_KEY, SPREADSHEET_ID_KEY])?;

        Ok(Self {
            credential: values.remove(AUTH_TOKEN_KEY).filter(|v| !v.is_empty()),
            spreadsheet_id: values.remove(SPREADSHEET_ID_KEY).filter(|v| !v.is_empty()),
        })
    }

    /// Write both values back, removing whichever is unset
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        let mut entries = Vec::new();

        match &self.credential {
            Some(token) => entries.push((AUTH_TOKEN_KEY, token.as_str())),
            None => store.remove(AUTH_TOKEN_KEY)?,
        }
        match &self.spreadsheet_id {
            Some(id) => entries.push((SPREADSHEET_ID_KEY, id.as_str())),
            None => store.remove(SPREADSHEET_ID_KEY)?,
        }

        if !entries.is_empty() {
            store.set(&entries)?;
        }
        Ok(())
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn spreadsheet_id(&self) -> Option<&str> {
        self.spreadsheet_id.as_deref()
    }

    pub fn state(&self) -> SessionState {
        match (&self.credential, &self.spreadsheet_id) {
            (None, _) => SessionState::Unauthenticated,
            (Some(_), None) => SessionState::Authenticated,
            (Some(_), Some(id)) => SessionState::SheetSelected(id.clone()),
        }
    }

    pub fn sign_in(&mut self, token: String) {
        info!("signed in");
        self.credential = Some(token);
    }

    pub fn clear_credential(&mut self) {
        info!("credential cleared");
        self.credential = None;
    }

    pub fn select_sheet(&mut self, spreadsheet_id: impl Into<String>) {
        let id = spreadsheet_id.into();
        info!(spreadsheet_id = %id, "sheet selected");
        self.spreadsheet_id = Some(id);
    }

    /// Drop the current selection so another sheet can be picked
    pub fn change_sheet(&mut self) {
        info!("sheet selection cleared");
        self.spreadsheet_id = None;
    }
}

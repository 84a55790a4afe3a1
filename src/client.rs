//! Session-aware front end over [`ListSynchronizer`]
//!
//! Each remote step (one write, one refresh, one listing) goes through the
//! re-authentication policy on its own, so a 401 never repeats a write that
//! already landed.

use std::future::Future;

use crate::auth::{authenticate, ReauthPolicy};
use crate::backend::SheetsBackend;
use crate::error::{Result, SyncError};
use crate::identity::{IdentityProvider, StaticIdentity};
use crate::session::Session;
use crate::store::KeyValueStore;
use crate::sync::ListSynchronizer;
use crate::types::{SessionState, SheetRef, TaskRecord};

/// What to show right after signing in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedIn {
    /// A sheet was already selected
    Tasks(Vec<TaskRecord>),
    /// No sheet yet; pick one of these
    Sheets(Vec<SheetRef>),
}

/// Identity, session and store, plus the policy tying them together
struct Credentials<S: KeyValueStore> {
    identity: Box<dyn IdentityProvider>,
    session: Session,
    store: S,
    policy: ReauthPolicy,
}

impl<S: KeyValueStore> Credentials<S> {
    async fn run<T, F, Fut>(&mut self, op: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.policy
            .run(self.identity.as_ref(), &mut self.session, &self.store, op)
            .await
    }
}

pub struct TodoClient<B: SheetsBackend, S: KeyValueStore> {
    sync: ListSynchronizer<B>,
    credentials: Credentials<S>,
}

impl<B: SheetsBackend, S: KeyValueStore> TodoClient<B, S> {
    /// Build a client around the session stored in `store`
    pub fn open(
        sync: ListSynchronizer<B>,
        identity: Box<dyn IdentityProvider>,
        store: S,
        policy: ReauthPolicy,
    ) -> Result<Self> {
        let session = Session::load(&store)?;

        Ok(Self {
            sync,
            credentials: Credentials {
                identity,
                session,
                store,
                policy,
            },
        })
    }

    /// Use a token handed over up front, in place of any cached one
    pub fn use_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.credentials.identity = Box::new(StaticIdentity::new(token.clone()));
        self.credentials.session.sign_in(token);
    }

    pub fn session(&self) -> &Session {
        &self.credentials.session
    }

    pub fn store(&self) -> &S {
        &self.credentials.store
    }

    pub fn sync(&self) -> &ListSynchronizer<B> {
        &self.sync
    }

    /// Write the session back to the store
    pub fn save(&self) -> Result<()> {
        self.credentials.session.save(&self.credentials.store)
    }

    fn selected_sheet(&self) -> Result<String> {
        self.credentials
            .session
            .spreadsheet_id()
            .map(str::to_string)
            .ok_or(SyncError::NoSheetSelected)
    }

    /// Interactive sign-in, then the tasks of the cached sheet or the sheets to choose from
    pub async fn login(&mut self) -> Result<SignedIn> {
        // Always prompt, even with a cached credential
        let credentials = &mut self.credentials;
        authenticate(
            credentials.identity.as_ref(),
            &mut credentials.session,
            &credentials.store,
        )
        .await?;

        // A remembered sheet goes straight to its tasks
        match self.credentials.session.state() {
            SessionState::SheetSelected(_) => Ok(SignedIn::Tasks(self.list().await?)),
            _ => Ok(SignedIn::Sheets(self.sheets().await?)),
        }
    }

    pub async fn sheets(&mut self) -> Result<Vec<SheetRef>> {
        let sync = &self.sync;
        self.credentials
            .run(|token| async move { sync.list_sheets(&token).await })
            .await
    }

    /// Active tasks of the selected sheet
    pub async fn list(&mut self) -> Result<Vec<TaskRecord>> {
        let sheet_id = self.selected_sheet()?;
        let sync = &self.sync;
        self.credentials
            .run(|token| {
                let sheet_id = sheet_id.clone();
                async move { sync.list(&token, &sheet_id).await }
            })
            .await
    }

    pub async fn select(&mut self, spreadsheet_id: &str) -> Result<Vec<TaskRecord>> {
        self.credentials.session.select_sheet(spreadsheet_id);
        self.list().await
    }

    /// Create a task spreadsheet, select it and return its id with its (empty) list
    pub async fn create(&mut self, title: &str) -> Result<(String, Vec<TaskRecord>)> {
        let sync = &self.sync;
        let id = self
            .credentials
            .run(|token| async move { sync.new_spreadsheet(&token, title).await })
            .await?;

        // Select before the header write so a failure there does not lose the new sheet
        self.credentials.session.select_sheet(id.clone());

        let header_id = id.clone();
        let sync = &self.sync;
        self.credentials
            .run(|token| {
                let header_id = header_id.clone();
                async move { sync.write_header(&token, &header_id).await }
            })
            .await?;

        let tasks = self.list().await?;
        Ok((id, tasks))
    }

    /// Forget the selection and list the sheets to choose from
    pub async fn change_sheet(&mut self) -> Result<Vec<SheetRef>> {
        self.credentials.session.change_sheet();
        self.sheets().await
    }

    pub async fn add(&mut self, text: &str) -> Result<Vec<TaskRecord>> {
        let sheet_id = self.selected_sheet()?;
        let sync = &self.sync;
        self.credentials
            .run(|token| {
                let sheet_id = sheet_id.clone();
                async move { sync.append_task(&token, &sheet_id, text).await }
            })
            .await?;

        self.list().await
    }

    pub async fn edit(&mut self, id: u32, text: &str) -> Result<Vec<TaskRecord>> {
        let sheet_id = self.selected_sheet()?;
        let sync = &self.sync;
        self.credentials
            .run(|token| {
                let sheet_id = sheet_id.clone();
                async move { sync.write_text(&token, &sheet_id, id, text).await }
            })
            .await?;

        self.list().await
    }

    pub async fn done(&mut self, id: u32) -> Result<Vec<TaskRecord>> {
        let sheet_id = self.selected_sheet()?;
        let sync = &self.sync;
        self.credentials
            .run(|token| {
                let sheet_id = sheet_id.clone();
                async move { sync.mark_done(&token, &sheet_id, id).await }
            })
            .await?;

        self.list().await
    }
}

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::identity::IdentityProvider;
use crate::session::Session;
use crate::store::{KeyValueStore, AUTH_TOKEN_KEY};

/// Interactive sign-in. The token is kept in the session and persisted.
pub async fn authenticate(
    identity: &dyn IdentityProvider,
    session: &mut Session,
    store: &dyn KeyValueStore,
) -> Result<String> {
    let token = identity.get_auth_token(true).await?;
    if token.is_empty() {
        return Err(SyncError::auth("No token received"));
    }

    store.set(&[(AUTH_TOKEN_KEY, token.as_str())])?;
    session.sign_in(token.clone());
    Ok(token)
}

/// How to react when the provider rejects the credential.
///
/// A 401 clears the cached credential, waits `delay`, and signs in again at
/// most `max_attempts` times. After a successful sign-in the operation is
/// issued once more with the fresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReauthPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReauthPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::from_secs(1),
        }
    }
}

impl ReauthPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Run `op` with the session's credential, signing in first if there is
    /// none, and applying the policy on a 401.
    pub async fn run<T, F, Fut>(
        &self,
        identity: &dyn IdentityProvider,
        session: &mut Session,
        store: &dyn KeyValueStore,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Sign in first when nothing is cached
        let token = match session.credential() {
            Some(token) => token.to_string(),
            None => authenticate(identity, session, store).await?,
        };

        let err = match op(token).await {
            Err(err) if err.is_unauthorized() => err,
            other => return other,
        };

        // Only a 401 gets here; drop the rejected credential everywhere
        warn!(error = %err, "credential rejected");
        forget_credential(session, store)?;

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.delay).await;
            info!(attempt, "re-authenticating");

            match authenticate(identity, session, store).await {
                Ok(token) => {
                    // One more try with the fresh token, never a second sign-in
                    let result = op(token).await;
                    if matches!(&result, Err(e) if e.is_unauthorized()) {
                        forget_credential(session, store)?;
                    }
                    return result;
                }
                Err(auth_err) => warn!(attempt, error = %auth_err, "re-authentication failed"),
            }
        }

        Err(err)
    }
}

fn forget_credential(session: &mut Session, store: &dyn KeyValueStore) -> Result<()> {
    session.clear_credential();
    store.remove(AUTH_TOKEN_KEY)
}

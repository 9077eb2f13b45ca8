//! Session gate: authentication state plus exclusive ownership of all
//! in-memory roster state.
//!
//! Everything the index holds lives and dies with the signed-in session;
//! sign-out drops it wholesale.

use crate::config::EventConfig;
use crate::error::{DeskError, Result};
use crate::reconcile::{self, ScanOutcome};
use crate::roster::{Attendee, RosterIndex, RosterStats};
use crate::store::{Identity, RosterStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Authentication gate states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Startup; nothing is allowed until the hosting layer signals ready
    Pending,
    SignedOut,
    SignedIn,
}

/// One operator session: the gate, the collaborator handles, and the
/// owned roster state
pub struct Session {
    auth: Arc<dyn Identity>,
    store: Arc<dyn RosterStore>,
    event: EventConfig,
    state: AuthState,
    roster: Option<RosterIndex>,
}

impl Session {
    pub fn new(auth: Arc<dyn Identity>, store: Arc<dyn RosterStore>, event: EventConfig) -> Self {
        Self {
            auth,
            store,
            event,
            state: AuthState::Pending,
            roster: None,
        }
    }

    /// Explicit ready signal from the hosting layer (terminal up, backend
    /// connected). Anything but the first call is a no-op.
    pub fn ready(&mut self) {
        if self.state == AuthState::Pending {
            self.state = AuthState::SignedOut;
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn roster(&self) -> Option<&RosterIndex> {
        self.roster.as_ref()
    }

    pub fn stats(&self) -> RosterStats {
        self.roster.as_ref().map(|r| r.stats()).unwrap_or_default()
    }

    /// Sign in and run the first full roster fetch.
    ///
    /// Provider errors are logged but never echoed: the caller gets a
    /// generic invalid-credentials message and the gate stays SignedOut.
    /// A fetch failure after a successful sign-in leaves the gate
    /// SignedIn and propagates as `Fetch` for the banner.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<()> {
        if self.state == AuthState::SignedIn {
            return Ok(());
        }
        match self.auth.sign_in(email, password).await {
            Ok(()) => {
                self.state = AuthState::SignedIn;
                self.refresh().await
            }
            Err(e) => {
                warn!("sign-in rejected: {}", e);
                Err(DeskError::Auth {
                    message: "Invalid credentials.".into(),
                })
            }
        }
    }

    /// Rebuild the index and display list from a full fetch
    pub async fn refresh(&mut self) -> Result<()> {
        if self.state != AuthState::SignedIn {
            return Err(DeskError::Internal {
                message: "refresh before sign-in".into(),
            });
        }
        let docs = self
            .store
            .fetch_roster()
            .await
            .map_err(|e| DeskError::Fetch {
                message: match e {
                    DeskError::Database { message } => message,
                    other => other.to_string(),
                },
            })?;
        let index = RosterIndex::build(docs);
        let stats = index.stats();
        info!(
            "Roster indexed: {} attendees, {} checked in",
            stats.total, stats.checked_in
        );
        self.roster = Some(index);
        Ok(())
    }

    /// Tear down all in-memory state and invalidate the remote session
    pub async fn sign_out(&mut self) -> Result<()> {
        self.roster = None;
        self.state = AuthState::SignedOut;
        if let Err(e) = self.auth.sign_out().await {
            warn!("remote sign-out failed: {}", e);
        }
        Ok(())
    }

    /// Check in from raw scanner text; see [`reconcile::check_in`]
    pub async fn check_in(&mut self, raw: &str) -> Result<ScanOutcome> {
        let Some(roster) = self.roster.as_mut() else {
            return Err(DeskError::Internal {
                message: "no roster loaded".into(),
            });
        };
        reconcile::check_in(roster, &*self.store, raw, &self.event.ticket_prefix).await
    }

    /// Toggle one attendee by canonical key; see [`reconcile::toggle`]
    pub async fn toggle(&mut self, key: &str) -> Result<Attendee> {
        let Some(roster) = self.roster.as_mut() else {
            return Err(DeskError::Internal {
                message: "no roster loaded".into(),
            });
        };
        reconcile::toggle(roster, &*self.store, key).await
    }

    /// Filtered display projection; empty before the first fetch
    pub fn filter(&self, query: &str) -> Vec<&Attendee> {
        self.roster
            .as_ref()
            .map(|r| r.filter(query))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::TeamDoc;
    use crate::store::{CheckInPatch, UpdateTarget};
    use async_trait::async_trait;

    struct FakeBackend {
        accept_password: &'static str,
        fail_fetch: bool,
    }

    #[async_trait]
    impl Identity for FakeBackend {
        async fn sign_in(&self, _email: &str, password: &str) -> Result<()> {
            if password == self.accept_password {
                Ok(())
            } else {
                Err(DeskError::Auth {
                    message: "provider says no".into(),
                })
            }
        }

        async fn sign_out(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl RosterStore for FakeBackend {
        async fn fetch_roster(&self) -> Result<Vec<TeamDoc>> {
            if self.fail_fetch {
                return Err(DeskError::Database {
                    message: "permission denied".into(),
                });
            }
            Ok(vec![TeamDoc {
                id: "t1".into(),
                name: Some("Ada".into()),
                ticket_id: Some("L1".into()),
                ..TeamDoc::default()
            }])
        }

        async fn update_attendee(&self, _target: &UpdateTarget, _patch: &CheckInPatch) -> Result<()> {
            Ok(())
        }
    }

    fn session(backend: FakeBackend) -> Session {
        let backend = Arc::new(backend);
        Session::new(backend.clone(), backend, EventConfig::default())
    }

    #[tokio::test]
    async fn gate_walks_pending_signed_out_signed_in() {
        let mut session = session(FakeBackend {
            accept_password: "pw",
            fail_fetch: false,
        });
        assert_eq!(session.state(), AuthState::Pending);
        session.ready();
        assert_eq!(session.state(), AuthState::SignedOut);

        session.sign_in("ops@example.org", "pw").await.unwrap();
        assert_eq!(session.state(), AuthState::SignedIn);
        assert_eq!(session.stats().total, 1);
    }

    #[tokio::test]
    async fn failed_sign_in_stays_signed_out_with_generic_message() {
        let mut session = session(FakeBackend {
            accept_password: "pw",
            fail_fetch: false,
        });
        session.ready();

        let err = session.sign_in("ops@example.org", "wrong").await.unwrap_err();
        match err {
            DeskError::Auth { message } => {
                assert_eq!(message, "Invalid credentials.");
                assert!(!message.contains("provider"));
            }
            other => panic!("expected Auth, got {other:?}"),
        }
        assert_eq!(session.state(), AuthState::SignedOut);
        assert!(session.roster().is_none());
    }

    #[tokio::test]
    async fn fetch_failure_after_sign_in_keeps_gate_open() {
        let mut session = session(FakeBackend {
            accept_password: "pw",
            fail_fetch: true,
        });
        session.ready();

        let err = session.sign_in("ops@example.org", "pw").await.unwrap_err();
        assert!(matches!(err, DeskError::Fetch { .. }));
        assert_eq!(session.state(), AuthState::SignedIn);
        assert!(session.roster().is_none());
    }

    #[tokio::test]
    async fn sign_out_drops_roster_state() {
        let mut session = session(FakeBackend {
            accept_password: "pw",
            fail_fetch: false,
        });
        session.ready();
        session.sign_in("ops@example.org", "pw").await.unwrap();
        assert!(session.roster().is_some());

        session.sign_out().await.unwrap();
        assert_eq!(session.state(), AuthState::SignedOut);
        assert!(session.roster().is_none());
        assert_eq!(session.stats(), RosterStats::default());
        assert!(session.filter("").is_empty());
    }

    #[tokio::test]
    async fn operations_before_roster_are_internal_errors() {
        let mut session = session(FakeBackend {
            accept_password: "pw",
            fail_fetch: false,
        });
        session.ready();

        assert!(matches!(
            session.check_in("L1").await.unwrap_err(),
            DeskError::Internal { .. }
        ));
        assert!(matches!(
            session.refresh().await.unwrap_err(),
            DeskError::Internal { .. }
        ));
    }
}

//! Owned dashboard context: session gate plus the published snapshot
//!
//! One context is created at startup and handed to whatever needs dashboard
//! data. It is the only writer of the snapshot; readers subscribe through a
//! `watch` channel and always observe a complete snapshot.
//!
//! Every sign-in, sign-out and refresh bumps a monotonic epoch. A refresh only
//! publishes if its epoch is still current when its fetches resolve, so an
//! abandoned or superseded cycle can never overwrite newer state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::services::data_loader::{DataLoaderService, FetchFailure};
use crate::services::store::DataStore;
use crate::types::{DashboardData, Session};

/// What readers see
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub data: Arc<DashboardData>,
    pub loading: bool,
    pub failure: Option<FetchFailure>,
    /// Epoch of the cycle that produced this snapshot
    pub epoch: u64,
}

/// Outcome of [`DashboardContext::refresh`]
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// New data published
    Applied,
    /// Fetch failed; the empty state was published
    Failed(FetchFailure),
    /// No active session, nothing fetched
    NoSession,
    /// A newer cycle, or a sign-out, happened while fetching; result discarded
    Superseded,
}

#[derive(Default)]
struct SessionState {
    session: Option<Session>,
    epoch: u64,
}

pub struct DashboardContext<S> {
    loader: DataLoaderService<S>,
    state: Mutex<SessionState>,
    snapshot: watch::Sender<Arc<DashboardSnapshot>>,
}

impl<S: DataStore> DashboardContext<S> {
    pub fn new(loader: DataLoaderService<S>) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(DashboardSnapshot::default()));
        Self {
            loader,
            state: Mutex::new(SessionState::default()),
            snapshot,
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.lock_state().session.clone()
    }

    /// Establish a session and run an aggregation cycle for it
    pub async fn sign_in(&self, session: Session) -> RefreshOutcome {
        {
            let mut state = self.lock_state();
            tracing::info!(email = ?session.email, "session established");
            state.session = Some(session);
            state.epoch += 1;
        }
        self.refresh().await
    }

    /// Drop the session and reset to the empty state
    pub fn sign_out(&self) {
        let mut state = self.lock_state();
        state.session = None;
        state.epoch += 1;
        self.snapshot.send_replace(Arc::new(DashboardSnapshot {
            epoch: state.epoch,
            ..DashboardSnapshot::default()
        }));
        tracing::info!("signed out, dashboard state reset");
    }

    /// Run one aggregation cycle and publish it if still current
    pub async fn refresh(&self) -> RefreshOutcome {
        let (session, epoch) = {
            let mut state = self.lock_state();
            let Some(session) = state.session.clone() else {
                self.snapshot.send_replace(Arc::new(DashboardSnapshot {
                    epoch: state.epoch,
                    ..DashboardSnapshot::default()
                }));
                return RefreshOutcome::NoSession;
            };
            state.epoch += 1;

            // Keep showing the previous data while loading
            let previous = self.snapshot();
            self.snapshot.send_replace(Arc::new(DashboardSnapshot {
                loading: true,
                epoch: state.epoch,
                ..(*previous).clone()
            }));
            (session, state.epoch)
        };

        let result = self.loader.load_and_aggregate(&session).await;

        let state = self.lock_state();
        if state.epoch != epoch || state.session.is_none() {
            tracing::debug!(epoch, current = state.epoch, "discarding superseded aggregation");
            return RefreshOutcome::Superseded;
        }

        let outcome = match &result.failure {
            Some(failure) => RefreshOutcome::Failed(failure.clone()),
            None => RefreshOutcome::Applied,
        };
        self.snapshot.send_replace(Arc::new(DashboardSnapshot {
            data: Arc::new(result.data),
            loading: false,
            failure: result.failure,
            epoch,
        }));
        outcome
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

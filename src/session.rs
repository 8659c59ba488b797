//! Asynchronous dashboard refreshes.
//!
//! A refresh resolves preferences, then fetches rows, then runs the pipeline.
//! Every refresh takes a new [`RequestToken`]; once a newer refresh has begun,
//! older ones stop at the next stage boundary. Results are published on a
//! `watch` channel, and a snapshot is only ever replaced by one with a higher
//! token, so a slow request finishing late cannot overwrite newer results.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::pipeline::{Dashboard, Pipeline};
use crate::preferences::{PreferenceOverrides, PreferenceStore, UserId, resolve_preferences};
use crate::records::series::HealthConcern;
use crate::source::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub token: RequestToken,
    pub dashboard: Arc<Dashboard>,
}

#[derive(Debug, Clone)]
pub enum Refresh {
    Published(Snapshot),
    /// A newer refresh began before this one finished; nothing was published.
    Superseded(RequestToken),
}

#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub user: Option<UserId>,
    pub overrides: PreferenceOverrides,
    pub concerns: Vec<HealthConcern>,
}

pub struct DashboardSession {
    pipeline: Pipeline,
    source: Box<dyn RecordSource>,
    store: Box<dyn PreferenceStore>,
    latest: AtomicU64,
    published: watch::Sender<Option<Snapshot>>,
}

impl DashboardSession {
    pub fn new(pipeline: Pipeline, source: Box<dyn RecordSource>, store: Box<dyn PreferenceStore>) -> Self {
        let (published, _) = watch::channel(None);
        Self {
            pipeline,
            source,
            store,
            latest: AtomicU64::new(0),
            published,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.published.subscribe()
    }

    /// The most recently published snapshot, if any.
    pub fn current(&self) -> Option<Snapshot> {
        self.published.borrow().clone()
    }

    /// Issues a new token, superseding every refresh in flight.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    #[tracing::instrument(skip_all, fields(source = %self.source.describe()))]
    pub async fn refresh(&self, request: RefreshRequest) -> Result<Refresh> {
        let token = self.begin();
        debug!(token = token.0, "Refresh started");

        let stored = match &request.user {
            Some(user) => resolve_preferences(self.store.as_ref(), user).await,
            None => None,
        };
        let prefs = stored.unwrap_or_default().with_overrides(&request.overrides);
        if !self.is_current(token) {
            return Ok(self.superseded(token, "preferences"));
        }

        let rows = self.source.fetch_rows().await?;
        if !self.is_current(token) {
            return Ok(self.superseded(token, "rows"));
        }

        let snapshot = Snapshot {
            token,
            dashboard: Arc::new(self.pipeline.run(&rows, &prefs, &request.concerns)),
        };

        let published = self.published.send_if_modified(|slot| {
            let newer_published = slot.as_ref().is_some_and(|s| s.token >= token);
            if newer_published || !self.is_current(token) {
                return false;
            }
            *slot = Some(snapshot.clone());
            true
        });

        if !published {
            return Ok(self.superseded(token, "publish"));
        }

        info!(token = token.0, "Snapshot published");
        Ok(Refresh::Published(snapshot))
    }

    fn superseded(&self, token: RequestToken, stage: &'static str) -> Refresh {
        debug!(token = token.0, stage, "Refresh superseded");
        Refresh::Superseded(token)
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::extraction::TextExtractor;
use crate::report::ReportGenerator;
use crate::session::submission::Session;
use crate::uploads::UploadCollector;

/// In-memory session registry. Sessions share only the extractor and the generator.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
    extractor: Arc<dyn TextExtractor>,
    generator: Arc<dyn ReportGenerator>,
    debounce: Duration,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn ReportGenerator>,
        debounce: Duration,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            extractor,
            generator,
            debounce,
            idle_ttl,
        }
    }

    pub async fn create(&self, auto_generate: bool) -> Arc<Session> {
        let collector = UploadCollector::new(Arc::clone(&self.extractor));
        let session = Arc::new(Session::new(
            collector,
            Arc::clone(&self.generator),
            auto_generate.then_some(self.debounce),
        ));
        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.id, Arc::clone(&session));
            sessions.len()
        };
        info!(
            "Created session {} (auto_generate: {auto_generate}, {active} active)",
            session.id
        );
        session
    }

    /// Looks up a session and marks it as in use.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch().await;
        Some(session)
    }

    /// Removes the session and stops its background work.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(session) => {
                session.shutdown().await;
                info!("Deleted session {id}");
                true
            }
            None => false,
        }
    }

    /// Removes every session idle for at least the TTL. A session with a
    /// report in flight is kept until that run ends. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();

        let mut evicted = 0;
        for session in sessions {
            if session.idle_for().await < self.idle_ttl || session.is_generating().await {
                continue;
            }
            if self.remove(session.id).await {
                info!("Evicted idle session {}", session.id);
                evicted += 1;
            }
        }
        evicted
    }

    /// Runs `evict_idle` every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle().await;
                if evicted > 0 {
                    debug!("Idle sweep removed {evicted} sessions");
                }
            }
        })
    }
}

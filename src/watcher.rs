// Keeps the container registry in step with daemon lifecycle events (watch-all mode).

use crate::collector::{ContainerCollector, ContainerEntity};
use crate::engine::EngineClient;
use crate::error::EngineError;
use crate::fleet::Fleet;
use crate::models::{LifecycleAction, LifecycleEvent, short_id};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type ContainerFleet = Fleet<ContainerEntity, ContainerCollector>;

#[derive(Clone)]
pub struct LifecycleWatcher {
    engine: Arc<dyn EngineClient>,
    fleet: Arc<ContainerFleet>,
    /// Track stopped containers too: admit on create, keep on die/destroy.
    include_all: bool,
}

impl LifecycleWatcher {
    pub fn new(engine: Arc<dyn EngineClient>, fleet: Arc<ContainerFleet>, include_all: bool) -> Self {
        Self {
            engine,
            fleet,
            include_all,
        }
    }

    /// Subscribe to events, then list existing containers, then keep applying events
    /// in the background. Subscribing first narrows the window in which a creation
    /// could fall between the listing and the first event. Failures go to `errors`;
    /// a failed subscription returns `None` and is not retried.
    pub async fn start(
        self,
        errors: mpsc::UnboundedSender<EngineError>,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let mut events = match self.engine.subscribe_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, operation = "subscribe_events", "event subscription failed");
                let _ = errors.send(e);
                return None;
            }
        };

        let pump = {
            let watcher = self.clone();
            let errors = errors.clone();
            tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        _ = cancel.cancelled() => break,
                        next = events.next() => next,
                    };
                    match next {
                        Some(Ok(event)) => watcher.handle(&event),
                        Some(Err(e)) => {
                            let _ = errors.send(e);
                        }
                        None => {
                            debug!("event stream ended");
                            break;
                        }
                    }
                }
            })
        };

        match self.engine.list_containers(self.include_all).await {
            Ok(containers) => {
                for c in containers {
                    self.fleet.admit(ContainerEntity::new(short_id(&c.id)));
                }
            }
            Err(e) => {
                warn!(error = %e, operation = "list_containers", "initial listing failed");
                let _ = errors.send(e);
            }
        }

        Some(pump)
    }

    /// Apply one lifecycle event to the fleet.
    pub fn handle(&self, event: &LifecycleEvent) {
        let key = short_id(&event.id);
        match event.action {
            LifecycleAction::Created if self.include_all => {
                self.fleet.admit(ContainerEntity::new(key));
            }
            LifecycleAction::Started => {
                self.fleet.admit(ContainerEntity::new(key));
            }
            LifecycleAction::Died | LifecycleAction::Removed if !self.include_all => {
                self.fleet.evict(key);
            }
            _ => {}
        }
    }
}

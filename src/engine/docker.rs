// EngineClient over the local Docker daemon via bollard

use super::{EngineClient, LifecycleStream, MetricStream};
use crate::error::EngineError;
use crate::models::{
    ContainerSummary, LifecycleAction, LifecycleEvent, VolumeMount, VolumeStatus,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    EventsOptions, InspectContainerOptions, ListContainersOptions, StatsOptions,
};
use bollard::models::EventMessage;
use futures_util::{FutureExt, StreamExt, future};
use std::collections::HashMap;
use std::pin::Pin;

#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl EngineClient for DockerEngine {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError> {
        let options = ListContainersOptions {
            all,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(map_error)?;

        Ok(containers
            .into_iter()
            .filter_map(|c| c.id.map(|id| ContainerSummary { id }))
            .collect())
    }

    async fn subscribe_events(&self) -> Result<LifecycleStream, EngineError> {
        self.docker.ping().await.map_err(map_error)?;

        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        let options = EventsOptions {
            filters: Some(filters),
            ..Default::default()
        };

        let mut stream = self
            .docker
            .events(Some(options))
            .filter_map(|r| {
                future::ready(match r {
                    Ok(msg) => lifecycle_event(msg).map(Ok),
                    Err(e) => Some(Err(map_error(e))),
                })
            })
            .boxed()
            .peekable();

        // Poll once so the request is in flight before the caller lists containers.
        // This only starts the request: bollard does not expose the response headers,
        // so ordering against a listing sent right after is best-effort.
        let failed = matches!(
            Pin::new(&mut stream).peek().now_or_never(),
            Some(Some(Err(_)))
        );
        if failed && let Some(Err(e)) = stream.next().await {
            return Err(e);
        }
        Ok(stream.boxed())
    }

    async fn open_stats(&self, key: &str, continuous: bool) -> Result<MetricStream, EngineError> {
        let options = StatsOptions {
            stream: continuous,
            ..Default::default()
        };
        let mut stream = self
            .docker
            .stats(key, Some(options))
            .map(|r| r.map_err(map_error))
            .boxed()
            .peekable();

        // An immediate daemon error (unknown container) is an open failure, not a frame.
        let failed = matches!(
            Pin::new(&mut stream).peek().await,
            Some(Err(e)) if !matches!(e, EngineError::Decode(_))
        );
        if failed && let Some(Err(e)) = stream.next().await {
            return Err(e);
        }
        Ok(stream.boxed())
    }

    async fn inspect_mounts(&self, key: &str) -> Result<Vec<VolumeMount>, EngineError> {
        let inspect = self
            .docker
            .inspect_container(key, None::<InspectContainerOptions>)
            .await
            .map_err(map_error)?;

        Ok(inspect
            .mounts
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                // Bind mounts carry no volume name.
                let volume_name = m.name.filter(|n| !n.is_empty())?;
                Some(VolumeMount {
                    volume_name,
                    driver_name: m.driver.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect_volume(&self, name: &str) -> Result<VolumeStatus, EngineError> {
        let volume = self.docker.inspect_volume(name).await.map_err(map_error)?;
        // Read the driver's status document generically; its shape is driver-defined.
        let doc = serde_json::to_value(&volume).map_err(|e| EngineError::Decode(e.to_string()))?;
        Ok(VolumeStatus {
            status: doc
                .get("Status")
                .and_then(|s| s.as_object())
                .cloned()
                .unwrap_or_default(),
        })
    }
}

fn lifecycle_event(msg: EventMessage) -> Option<LifecycleEvent> {
    let action = LifecycleAction::from_docker(msg.action.as_deref()?)?;
    let id = msg.actor?.id?;
    Some(LifecycleEvent { action, id })
}

fn map_error(e: bollard::errors::Error) -> EngineError {
    use bollard::errors::Error;
    match e {
        Error::DockerResponseServerError {
            status_code,
            message,
        } => EngineError::Api {
            status: status_code,
            message,
        },
        e @ (Error::JsonDataError { .. } | Error::JsonSerdeError { .. }) => {
            EngineError::Decode(e.to_string())
        }
        e => {
            let text = e.to_string();
            if text.contains("IncompleteMessage")
                || text.contains("connection closed before message completed")
                || text.contains("unexpected EOF")
            {
                EngineError::Disconnected
            } else {
                EngineError::Transport(text)
            }
        }
    }
}

// Container lifecycle events

/// Lifecycle transitions the watcher reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Created,
    Started,
    Died,
    Removed,
}

impl LifecycleAction {
    /// Parse from the Docker event action string; `None` for actions we ignore.
    pub fn from_docker(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "create" => Some(LifecycleAction::Created),
            "start" => Some(LifecycleAction::Started),
            "die" => Some(LifecycleAction::Died),
            "destroy" => Some(LifecycleAction::Removed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub action: LifecycleAction,
    pub id: String,
}

//! Kind-specific operations valid for an entity's observed state.

use serde::{Deserialize, Serialize};

/// An operation the external platform will currently accept for an entity.
///
/// Action sets are recomputed from the observed external state on every
/// reconciliation pass and never persisted. The registry only advertises
/// them; invoking an action belongs to the per-kind write handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    // Compute
    Start,
    Stop,
    Restart,
    Suspend,

    // Storage
    Online,
    Offline,
    Backup,
    Snapshot,
    Resize,

    // Network
    Up,
    Down,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Suspend => "suspend",
            Action::Online => "online",
            Action::Offline => "offline",
            Action::Backup => "backup",
            Action::Snapshot => "snapshot",
            Action::Resize => "resize",
            Action::Up => "up",
            Action::Down => "down",
        };
        f.write_str(name)
    }
}

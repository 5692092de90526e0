/// Misuse of the queue API. Failed fetches are never reported through this
/// type; they come back as `Err(String)` outcomes keyed by item id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue has been shut down")]
    Shutdown,

    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),
}

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// A zero-argument fetch the queue may invoke more than once (retries).
pub type Operation<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// Terminal result reported to callers. Failures are data, never panics.
pub type Outcome<T> = Result<T, String>;

/// Lane order is declaration order: `Priority::iter()` walks high to low.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Cached,
    Completed,
    Failed,
}

/// One unit of requested work. Owned by exactly one lane while pending, then
/// by the executor while it runs.
pub struct WorkItem<T> {
    pub id: String,
    pub priority: Priority,
    pub cache_key: Option<String>,
    /// Cache lifetime; the manager default applies when unset
    pub ttl: Option<Duration>,
    pub submitted_at: Instant,
    pub status: ItemStatus,
    pub attempts: u32,
    /// Overrides the manager's retry budget for this item
    pub max_attempts: Option<u32>,
    pub(crate) operation: Operation<T>,
    pub(crate) waiters: Vec<oneshot::Sender<Outcome<T>>>,
}

impl<T> WorkItem<T> {
    pub fn new<F, Fut>(id: impl Into<String>, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            id: id.into(),
            priority: Priority::default(),
            cache_key: None,
            ttl: None,
            submitted_at: Instant::now(),
            status: ItemStatus::Pending,
            attempts: 0,
            max_attempts: None,
            operation: Arc::new(move || fetch().boxed()),
            waiters: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub(crate) fn invoke(&self) -> BoxFuture<'static, anyhow::Result<T>> {
        (self.operation)()
    }

    /// Identity used when collapsing duplicate submissions.
    pub(crate) fn dedup_key(&self) -> (String, Option<String>) {
        (self.id.clone(), self.cache_key.clone())
    }

    pub(crate) fn add_waiter(&mut self) -> oneshot::Receiver<Outcome<T>> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }
}

impl<T: Clone> WorkItem<T> {
    /// Hand the terminal outcome to everyone holding a ticket for this item.
    pub(crate) fn resolve(&mut self, outcome: &Outcome<T>) {
        for waiter in self.waiters.drain(..) {
            // receiver may have been dropped; nothing to do then
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl<T> fmt::Debug for WorkItem<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("cache_key", &self.cache_key)
            .field("ttl", &self.ttl)
            .field("status", &self.status)
            .field("attempts", &self.attempts)
            .field("max_attempts", &self.max_attempts)
            .field("waiters", &self.waiters.len())
            .finish()
    }
}

/// Completion handle for a tracked submission.
#[derive(Debug)]
pub struct Ticket<T> {
    id: String,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> Ticket<T> {
    pub(crate) fn new(id: String, rx: oneshot::Receiver<Outcome<T>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Non-blocking check. `None` while the item is still in flight.
    pub fn try_take(&mut self) -> Option<Outcome<T>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(abandoned(&self.id))),
        }
    }

    pub async fn wait(self) -> Outcome<T> {
        let id = self.id;
        self.rx.await.unwrap_or_else(|_| Err(abandoned(&id)))
    }
}

fn abandoned(id: &str) -> String {
    format!("request [{}] was dropped before completing", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_priority_order_and_names() {
        let order: Vec<Priority> = Priority::iter().collect();
        assert_eq!(order, vec![Priority::High, Priority::Normal, Priority::Low]);
        assert_eq!(Priority::High.to_string(), "high");
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_builder_defaults() {
        let item: WorkItem<u32> = WorkItem::new("coins", || async { Ok(1) });
        assert_eq!(item.priority, Priority::Normal);
        assert_eq!(item.ttl, None);
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.attempts, 0);
        assert!(item.cache_key.is_none());
        assert_eq!(item.max_attempts, None);
    }

    #[tokio::test]
    async fn test_operation_can_be_invoked_repeatedly() {
        let item = WorkItem::new("x", || async { Ok::<_, anyhow::Error>(7u8) })
            .priority(Priority::High)
            .cache_key("x-key");

        assert_eq!(item.invoke().await.unwrap(), 7);
        assert_eq!(item.invoke().await.unwrap(), 7);
        assert_eq!(item.dedup_key(), ("x".to_string(), Some("x-key".to_string())));
    }

    #[tokio::test]
    async fn test_resolve_reaches_every_waiter() {
        let mut item = WorkItem::new("x", || async { Ok(1u8) });
        let mut first = Ticket::new(item.id.clone(), item.add_waiter());
        let second = Ticket::new(item.id.clone(), item.add_waiter());

        assert!(first.try_take().is_none());
        item.resolve(&Ok(5));

        assert_eq!(first.try_take(), Some(Ok(5)));
        assert_eq!(second.wait().await, Ok(5));
    }

    #[tokio::test]
    async fn test_dropped_item_abandons_ticket() {
        let mut item = WorkItem::new("gone", || async { Ok(1u8) });
        let ticket = Ticket::new(item.id.clone(), item.add_waiter());
        drop(item);

        let outcome = ticket.wait().await;
        assert!(outcome.unwrap_err().contains("gone"));
    }
}

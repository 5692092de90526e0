use super::item::{ItemStatus, WorkItem};

/// What happens to an item after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back to the front of the low lane
    Retry { attempt: u32 },
    /// Out of attempts; the error becomes the item's result
    GiveUp { attempts: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Attempts allowed for `item`: its own override, else the policy's.
    pub fn budget_for<T>(&self, item: &WorkItem<T>) -> u32 {
        item.max_attempts.unwrap_or(self.max_attempts).max(1)
    }

    /// Count the failed attempt against the item and decide its fate.
    pub fn on_failure<T>(&self, item: &mut WorkItem<T>) -> RetryDecision {
        item.attempts += 1;
        item.status = ItemStatus::Failed;

        if item.attempts < self.budget_for(item) {
            RetryDecision::Retry {
                attempt: item.attempts,
            }
        } else {
            RetryDecision::GiveUp {
                attempts: item.attempts,
            }
        }
    }
}

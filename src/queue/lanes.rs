use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use strum::IntoEnumIterator;

use super::item::{Priority, WorkItem};

/// Pending item counts per lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LaneCounts {
    pub high: usize,
    pub normal: usize,
    pub low: usize,
}

impl LaneCounts {
    pub fn total(&self) -> usize {
        self.high + self.normal + self.low
    }
}

/// Three FIFO lanes drained in strict priority order.
///
/// There is no anti-starvation: a steady stream of high items keeps the low
/// lane waiting. Low work (including retries) is best effort.
#[derive(Debug)]
pub struct LaneSet<T> {
    high: VecDeque<WorkItem<T>>,
    normal: VecDeque<WorkItem<T>>,
    low: VecDeque<WorkItem<T>>,
}

impl<T> Default for LaneSet<T> {
    fn default() -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
            low: VecDeque::new(),
        }
    }
}

impl<T> LaneSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane_mut(&mut self, priority: Priority) -> &mut VecDeque<WorkItem<T>> {
        match priority {
            Priority::High => &mut self.high,
            Priority::Normal => &mut self.normal,
            Priority::Low => &mut self.low,
        }
    }

    /// Append to the tail of the lane matching `item.priority`.
    pub fn enqueue(&mut self, item: WorkItem<T>) {
        self.lane_mut(item.priority).push_back(item);
    }

    /// Retries jump the low lane but never preempt high or normal work.
    pub fn requeue_retry(&mut self, mut item: WorkItem<T>) {
        item.priority = Priority::Low;
        self.low.push_front(item);
    }

    /// Put back an item that was dequeued but never started.
    pub fn restore(&mut self, item: WorkItem<T>) {
        self.lane_mut(item.priority).push_front(item);
    }

    pub fn dequeue_next(&mut self) -> Option<WorkItem<T>> {
        for priority in Priority::iter() {
            if let Some(item) = self.lane_mut(priority).pop_front() {
                return Some(item);
            }
        }
        None
    }

    /// Collapse duplicates sharing `(id, cache_key)` within each lane. The
    /// last submission wins but keeps the first one's position, and inherits
    /// every waiter of the copies it replaces. Returns how many were dropped.
    pub fn optimize(&mut self) -> usize {
        Priority::iter()
            .map(|priority| dedup_lane(self.lane_mut(priority)))
            .sum()
    }

    pub fn counts(&self) -> LaneCounts {
        LaneCounts {
            high: self.high.len(),
            normal: self.normal.len(),
            low: self.low.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn drain(&mut self) -> Vec<WorkItem<T>> {
        let mut items = Vec::with_capacity(self.len());
        for priority in Priority::iter() {
            items.extend(self.lane_mut(priority).drain(..));
        }
        items
    }
}

fn dedup_lane<T>(lane: &mut VecDeque<WorkItem<T>>) -> usize {
    let before = lane.len();
    let mut kept: Vec<WorkItem<T>> = Vec::with_capacity(before);
    let mut slots: HashMap<(String, Option<String>), usize> = HashMap::new();

    for mut item in lane.drain(..) {
        match slots.get(&item.dedup_key()) {
            Some(&slot) => {
                let mut waiters = std::mem::take(&mut kept[slot].waiters);
                waiters.append(&mut item.waiters);
                item.waiters = waiters;
                kept[slot] = item;
            }
            None => {
                slots.insert(item.dedup_key(), kept.len());
                kept.push(item);
            }
        }
    }

    lane.extend(kept);
    before - lane.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::item::Ticket;

    fn item(id: &str, priority: Priority) -> WorkItem<u32> {
        WorkItem::new(id, || async { Ok(0) }).priority(priority)
    }

    fn drain_ids(lanes: &mut LaneSet<u32>) -> Vec<String> {
        std::iter::from_fn(|| lanes.dequeue_next())
            .map(|item| item.id)
            .collect()
    }

    #[test]
    fn test_strict_priority_order() {
        let mut lanes = LaneSet::new();
        lanes.enqueue(item("low-1", Priority::Low));
        lanes.enqueue(item("normal-1", Priority::Normal));
        lanes.enqueue(item("high-1", Priority::High));
        lanes.enqueue(item("normal-2", Priority::Normal));
        lanes.enqueue(item("high-2", Priority::High));

        assert_eq!(
            drain_ids(&mut lanes),
            vec!["high-1", "high-2", "normal-1", "normal-2", "low-1"]
        );
        assert!(lanes.dequeue_next().is_none());
    }

    #[test]
    fn test_retry_goes_to_front_of_low_lane() {
        let mut lanes = LaneSet::new();
        lanes.enqueue(item("low-1", Priority::Low));
        lanes.enqueue(item("normal-1", Priority::Normal));
        lanes.requeue_retry(item("retry", Priority::High));

        assert_eq!(lanes.counts(), LaneCounts { high: 0, normal: 1, low: 2 });
        assert_eq!(drain_ids(&mut lanes), vec!["normal-1", "retry", "low-1"]);
    }

    #[test]
    fn test_restore_keeps_lane_head() {
        let mut lanes = LaneSet::new();
        lanes.enqueue(item("a", Priority::Normal));
        lanes.enqueue(item("b", Priority::Normal));

        let head = lanes.dequeue_next().unwrap();
        lanes.restore(head);
        assert_eq!(drain_ids(&mut lanes), vec!["a", "b"]);
    }

    #[test]
    fn test_optimize_collapses_duplicates_per_lane() {
        let mut lanes = LaneSet::new();
        lanes.enqueue(item("btc", Priority::Normal).cache_key("k1"));
        lanes.enqueue(item("eth", Priority::Normal).cache_key("k2"));
        lanes.enqueue(item("btc", Priority::Normal).cache_key("k1"));
        lanes.enqueue(item("btc", Priority::Normal).cache_key("other"));
        lanes.enqueue(item("btc", Priority::Low).cache_key("k1"));

        assert_eq!(lanes.optimize(), 1);
        assert_eq!(lanes.counts(), LaneCounts { high: 0, normal: 3, low: 1 });
        assert_eq!(drain_ids(&mut lanes), vec!["btc", "eth", "btc", "btc"]);
    }

    #[test]
    fn test_optimize_keeps_last_submission_and_all_waiters() {
        let mut lanes = LaneSet::new();
        let mut first = item("dup", Priority::High).ttl(std::time::Duration::from_secs(1));
        let mut second = item("dup", Priority::High).ttl(std::time::Duration::from_secs(2));
        let mut t1 = Ticket::new("dup".into(), first.add_waiter());
        let mut t2 = Ticket::new("dup".into(), second.add_waiter());
        lanes.enqueue(first);
        lanes.enqueue(second);

        lanes.optimize();
        let mut survivor = lanes.dequeue_next().unwrap();
        assert_eq!(survivor.ttl, Some(std::time::Duration::from_secs(2)));
        assert_eq!(survivor.waiters.len(), 2);

        survivor.resolve(&Ok(9));
        assert_eq!(t1.try_take(), Some(Ok(9)));
        assert_eq!(t2.try_take(), Some(Ok(9)));
    }

    #[test]
    fn test_drain_empties_all_lanes() {
        let mut lanes = LaneSet::new();
        lanes.enqueue(item("a", Priority::Low));
        lanes.enqueue(item("b", Priority::High));

        let drained = lanes.drain();
        assert_eq!(drained.len(), 2);
        assert!(lanes.is_empty());
    }
}

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    hash::Hash,
};

use crate::foundation::core::Millis;

/// Deadline-ordered timer queue keyed by caller-chosen wake tokens.
///
/// Timers due at the same instant fire in scheduling order. Re-scheduling a key replaces the
/// previous deadline; cancelled entries are dropped lazily when they reach the front.
#[derive(Debug)]
pub struct TimerQueue<K> {
    heap: BinaryHeap<Reverse<(Millis, u64)>>,
    live: HashMap<u64, K>,
    by_key: HashMap<K, u64>,
    next_seq: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
            by_key: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Clone + Eq + Hash> TimerQueue<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Millis, key: K) {
        self.cancel(&key);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse((at, seq)));
        self.live.insert(seq, key.clone());
        self.by_key.insert(key, seq);
    }

    /// Returns true when a pending timer was removed.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.by_key.remove(key) {
            Some(seq) => self.live.remove(&seq).is_some(),
            None => false,
        }
    }

    /// Cancel every pending timer whose key matches `pred`.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let doomed: Vec<K> = self.by_key.keys().filter(|k| pred(k)).cloned().collect();
        doomed.iter().filter(|k| self.cancel(k)).count()
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn next_deadline(&mut self) -> Option<Millis> {
        self.drop_cancelled_front();
        self.heap.peek().map(|Reverse((at, _))| *at)
    }

    /// Pop the earliest timer if it is due at or before `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(Millis, K)> {
        self.drop_cancelled_front();
        let Reverse((at, seq)) = *self.heap.peek()?;
        if at > now {
            return None;
        }
        self.heap.pop();
        let key = self.live.remove(&seq)?;
        self.by_key.remove(&key);
        Some((at, key))
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn drop_cancelled_front(&mut self) {
        while let Some(Reverse((_, seq))) = self.heap.peek() {
            if self.live.contains_key(seq) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_then_fifo_order() {
        let mut q = TimerQueue::new();
        q.schedule(Millis(300), "c");
        q.schedule(Millis(100), "a");
        q.schedule(Millis(100), "b");

        assert_eq!(q.pop_due(Millis(1000)), Some((Millis(100), "a")));
        assert_eq!(q.pop_due(Millis(1000)), Some((Millis(100), "b")));
        assert_eq!(q.pop_due(Millis(1000)), Some((Millis(300), "c")));
        assert_eq!(q.pop_due(Millis(1000)), None);
    }

    #[test]
    fn not_due_before_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(Millis(3000), 1u8);
        assert_eq!(q.pop_due(Millis(2999)), None);
        assert_eq!(q.pop_due(Millis(3000)), Some((Millis(3000), 1)));
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        q.schedule(Millis(10), "x");
        q.schedule(Millis(20), "y");
        assert!(q.cancel(&"x"));
        assert!(!q.cancel(&"x"));
        assert_eq!(q.next_deadline(), Some(Millis(20)));
        assert_eq!(q.pop_due(Millis(100)), Some((Millis(20), "y")));
        assert!(q.is_empty());
    }

    #[test]
    fn rescheduling_replaces_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(Millis(10), "x");
        q.schedule(Millis(50), "x");
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop_due(Millis(20)), None);
        assert_eq!(q.pop_due(Millis(50)), Some((Millis(50), "x")));
    }

    #[test]
    fn cancel_where_filters_keys() {
        let mut q = TimerQueue::new();
        for k in 0..6u32 {
            q.schedule(Millis(u64::from(k)), k);
        }
        assert_eq!(q.cancel_where(|k| k % 2 == 0), 3);
        assert_eq!(q.len(), 3);
        assert!(q.is_scheduled(&1));
        assert!(!q.is_scheduled(&2));
    }
}

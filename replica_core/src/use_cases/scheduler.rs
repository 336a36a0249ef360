// Delay/timer scheduler driven by the participant's simulation clock.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Timer<A> {
    handle: TimerHandle,
    due: Duration,
    action: A,
}

/// Keyed one-shot timers.
///
/// At most one timer is live per key; scheduling a live key cancels and replaces it. A timer
/// is returned by `advance` exactly once, or never if it was cancelled first.
pub struct Scheduler<K, A> {
    now: Duration,
    next_handle: u64,
    timers: HashMap<K, Timer<A>>,
}

impl<K, A> Default for Scheduler<K, A> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_handle: 1,
            timers: HashMap::new(),
        }
    }
}

impl<K, A> Scheduler<K, A>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, key: K, delay: Duration, action: A) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.insert(
            key,
            Timer {
                handle,
                due: self.now + delay,
                action,
            },
        );
        handle
    }

    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let key = self
            .timers
            .iter()
            .find(|(_, t)| t.handle == handle)
            .map(|(k, _)| k.clone());
        match key {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn cancel_key(&mut self, key: &K) -> bool {
        self.timers.remove(key).is_some()
    }

    /// Cancels every timer whose key matches, e.g. all timers of a destroyed entity.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.timers.len();
        self.timers.retain(|k, _| !pred(k));
        before - self.timers.len()
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.timers.contains_key(key)
    }

    pub fn remaining(&self, key: &K) -> Option<Duration> {
        self.timers
            .get(key)
            .map(|t| t.due.saturating_sub(self.now))
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Moves the clock forward and removes every timer due at or before `now`,
    /// returned in due order (ties broken by scheduling order).
    pub fn advance(&mut self, now: Duration) -> Vec<(K, A)> {
        if now > self.now {
            self.now = now;
        }

        let due: Vec<K> = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= self.now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut expired: Vec<(Duration, TimerHandle, K, A)> = due
            .into_iter()
            .filter_map(|k| {
                self.timers
                    .remove(&k)
                    .map(|t| (t.due, t.handle, k, t.action))
            })
            .collect();
        expired.sort_by_key(|(due, handle, _, _)| (*due, handle.0));
        expired.into_iter().map(|(_, _, k, a)| (k, a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn when_timer_is_due_then_it_fires_exactly_once() {
        let mut scheduler: Scheduler<&str, u32> = Scheduler::new();
        scheduler.schedule("reload", secs(1.5), 7);
        assert!(scheduler.advance(secs(1.0)).is_empty());
        assert_eq!(scheduler.advance(secs(1.5)), vec![("reload", 7)]);
        assert!(scheduler.advance(secs(5.0)).is_empty());
    }

    #[test]
    fn when_key_is_rescheduled_then_previous_timer_is_replaced() {
        let mut scheduler: Scheduler<&str, u32> = Scheduler::new();
        let first = scheduler.schedule("cooldown", secs(10.0), 1);
        scheduler.advance(secs(2.0));
        scheduler.schedule("cooldown", secs(1.0), 2);
        assert_eq!(scheduler.len(), 1);
        assert!(!scheduler.cancel(first));
        assert_eq!(scheduler.remaining(&"cooldown"), Some(secs(1.0)));
        assert_eq!(scheduler.advance(secs(3.0)), vec![("cooldown", 2)]);
    }

    #[test]
    fn when_timer_is_cancelled_then_it_never_fires() {
        let mut scheduler: Scheduler<&str, u32> = Scheduler::new();
        let handle = scheduler.schedule("revive", secs(10.0), 1);
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert!(scheduler.advance(secs(20.0)).is_empty());
    }

    #[test]
    fn when_cancelling_by_predicate_then_only_matching_timers_are_removed() {
        let mut scheduler: Scheduler<(u64, &str), ()> = Scheduler::new();
        scheduler.schedule((1, "reload"), secs(1.0), ());
        scheduler.schedule((1, "revive"), secs(1.0), ());
        scheduler.schedule((2, "reload"), secs(1.0), ());
        assert_eq!(scheduler.cancel_where(|(entity, _)| *entity == 1), 2);
        assert_eq!(scheduler.advance(secs(1.0)), vec![((2, "reload"), ())]);
    }

    #[test]
    fn when_several_timers_expire_then_they_are_returned_in_due_order() {
        let mut scheduler: Scheduler<&str, u32> = Scheduler::new();
        scheduler.schedule("late", secs(3.0), 3);
        scheduler.schedule("early", secs(1.0), 1);
        scheduler.schedule("tie", secs(1.0), 2);
        let fired: Vec<u32> = scheduler.advance(secs(5.0)).into_iter().map(|(_, a)| a).collect();
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn when_clock_goes_backwards_then_it_is_ignored() {
        let mut scheduler: Scheduler<&str, u32> = Scheduler::new();
        scheduler.advance(secs(5.0));
        scheduler.advance(secs(1.0));
        assert_eq!(scheduler.now(), secs(5.0));
    }
}

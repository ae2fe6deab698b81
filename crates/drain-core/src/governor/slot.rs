use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// Counts executing actions and remembers the high-water mark.
///
/// The governor's own admission mechanism (semaphore or fixed worker set) is what
/// enforces the cap; the tracker makes the live count observable and checks the
/// `in_flight <= capacity` invariant on every entry.
#[derive(Debug)]
pub struct SlotTracker {
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlotTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Actions executing right now.
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest `in_flight` observed so far.
    #[inline]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Marks one action as executing until the returned guard is dropped.
    ///
    /// Compare-and-increment: the counter never moves past `capacity`, even
    /// transiently. Returns `None` if it would.
    pub fn try_enter(self: &Arc<Self>) -> Option<SlotGuard> {
        let capacity = self.capacity;
        let prev = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .ok()?;
        self.peak.fetch_max(prev + 1, Ordering::AcqRel);
        Some(SlotGuard {
            tracker: Arc::clone(self),
        })
    }
}

/// Releases exactly one slot on drop, whether the action returned, failed,
/// panicked or was cancelled.
#[derive(Debug)]
pub struct SlotGuard {
    tracker: Arc<SlotTracker>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.tracker.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_release_track_peak() {
        let tracker = Arc::new(SlotTracker::new(2));

        let a = tracker.try_enter().unwrap();
        let b = tracker.try_enter().unwrap();
        assert_eq!(tracker.in_flight(), 2);

        drop(a);
        assert_eq!(tracker.in_flight(), 1);
        drop(b);
        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(tracker.peak(), 2);
    }

    #[test]
    fn never_exceeds_capacity() {
        let tracker = Arc::new(SlotTracker::new(1));
        let _held = tracker.try_enter().unwrap();

        assert!(tracker.try_enter().is_none());
        assert_eq!(tracker.in_flight(), 1);
        assert_eq!(tracker.peak(), 1);
    }
}

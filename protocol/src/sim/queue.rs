//! # Event Queue
//!
//! The scheduling kernel: a priority-ordered timeline of future events
//! keyed by simulated time.
//!
//! Events are ordered by:
//! 1. Time (earlier first)
//! 2. Sequence number (FIFO among events scheduled for the same time)
//!
//! Popping an event advances the simulated clock to its time, so the clock
//! never moves backwards.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use thiserror::Error;

use crate::sim::event::Event;

/// Errors returned when an event cannot be placed on the timeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// Delays must be finite and non-negative.
    #[error("invalid delay {0}: must be finite and non-negative")]
    InvalidDelay(f64),

    /// Absolute times must be finite and not in the past.
    #[error("cannot schedule at {time}, clock is already at {now}")]
    InThePast { time: f64, now: f64 },
}

/// What the gossip layer and the driver need from the scheduling kernel.
pub trait Timeline {
    /// Current simulated time.
    fn now(&self) -> f64;

    /// Schedules `event` to fire at absolute simulated `time`.
    fn schedule_at(&mut self, time: f64, event: Event) -> Result<(), ScheduleError>;

    /// Schedules `event` to fire `delay` after the current time.
    fn schedule_in(&mut self, delay: f64, event: Event) -> Result<(), ScheduleError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(ScheduleError::InvalidDelay(delay));
        }
        let at = self.now() + delay;
        self.schedule_at(at, event)
    }
}

/// Key for ordering entries in the queue.
#[derive(Debug, Clone, Copy)]
struct EventKey {
    time: f64,
    sequence: u64,
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
struct Scheduled {
    key: EventKey,
    event: Event,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Scheduled {}

// Reversed so the max-heap pops the earliest key first.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.cmp(&self.key)
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Binary-heap timeline with a simulated clock.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Scheduled>,
    now: f64,
    next_sequence: u64,
}

impl EventQueue {
    /// Creates an empty queue with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the earliest event and advances the clock to its time.
    pub fn pop(&mut self) -> Option<(f64, Event)> {
        let Scheduled { key, event } = self.heap.pop()?;
        self.now = key.time;
        Some((key.time, event))
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|s| s.key.time)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no event is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Timeline for EventQueue {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule_at(&mut self, time: f64, event: Event) -> Result<(), ScheduleError> {
        if !time.is_finite() || time < self.now {
            return Err(ScheduleError::InThePast { time, now: self.now });
        }
        let key = EventKey {
            time,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.heap.push(Scheduled { key, event });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::BlockRelay;

    fn relay(block_no: u64) -> Event {
        Event::BlockRelay(BlockRelay {
            block_no,
            from: 0,
            to: 1,
        })
    }

    #[test]
    fn pops_in_time_order_and_advances_clock() {
        let mut queue = EventQueue::new();
        queue.schedule_in(5.0, relay(1)).unwrap();
        queue.schedule_in(1.0, relay(2)).unwrap();
        queue.schedule_in(3.0, relay(3)).unwrap();

        let (t, e) = queue.pop().unwrap();
        assert_eq!((t, e), (1.0, relay(2)));
        assert_eq!(queue.now(), 1.0);

        queue.schedule_in(1.0, relay(4)).unwrap();
        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|(t, _)| t).collect();
        assert_eq!(order, vec![2.0, 3.0, 5.0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn ties_are_fifo() {
        let mut queue = EventQueue::new();
        for n in 0..5 {
            queue.schedule_at(2.0, relay(n)).unwrap();
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        let expected: Vec<_> = (0..5).map(|n| (2.0, relay(n))).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn rejects_invalid_delays() {
        let mut queue = EventQueue::new();
        assert_eq!(
            queue.schedule_in(-1.0, Event::NewBlock),
            Err(ScheduleError::InvalidDelay(-1.0))
        );
        assert!(queue.schedule_in(f64::NAN, Event::NewBlock).is_err());
        assert!(queue.schedule_in(f64::INFINITY, Event::NewBlock).is_err());
        assert!(queue.is_empty());
    }

    #[test]
    fn rejects_times_in_the_past() {
        let mut queue = EventQueue::new();
        queue.schedule_at(4.0, Event::NewBlock).unwrap();
        queue.pop();
        assert!(matches!(
            queue.schedule_at(3.0, Event::NewTransaction),
            Err(ScheduleError::InThePast { .. })
        ));
        assert_eq!(queue.peek_time(), None);
    }
}

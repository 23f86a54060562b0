//! One-shot delayed actions
//!
//! `EventTimer` runs each registered action exactly once, after a delay in
//! simulated seconds. Registration and cancellation are safe while the timer
//! is being updated: actions capture a [`TimerHandle`] and schedule through
//! it, which lands in the next-frame buffer.

use crate::clock::Clock;
use cinder_core::Result;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Deferred work run once by an [`EventTimer`]
pub type TimedAction<C> = Box<dyn FnOnce(&mut C) -> Result<()>>;

/// Opaque identifier returned when an action is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct TimedEntry<C> {
    id: TimerId,
    remaining: f32,
    /// `None` once fired or cancelled; swept at the end of the pass
    action: Option<TimedAction<C>>,
}

/// State reachable from handles while the active set is being iterated
struct Shared<C> {
    pending: Vec<TimedEntry<C>>,
    cancelled: Vec<TimerId>,
    next_id: u64,
}

impl<C> Shared<C> {
    fn push(&mut self, seconds: f32, action: TimedAction<C>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(TimedEntry {
            id,
            remaining: seconds,
            action: Some(action),
        });
        id
    }

    /// Drop a not-yet-merged entry. Returns true if it was pending.
    fn remove_pending(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.id != id);
        self.pending.len() != before
    }
}

/// Schedules actions to run once after a number of simulated seconds
pub struct EventTimer<C = ()> {
    active: Vec<TimedEntry<C>>,
    shared: Rc<RefCell<Shared<C>>>,
}

impl<C> Default for EventTimer<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventTimer<C> {
    pub fn new() -> Self {
        Self {
            active: Vec::new(),
            shared: Rc::new(RefCell::new(Shared {
                pending: Vec::new(),
                cancelled: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Run `action` once, after `seconds` of simulated time have elapsed.
    ///
    /// The entry joins the active set at the start of the next update, so it
    /// never fires during the pass it was registered in.
    pub fn schedule<F>(&mut self, seconds: f32, action: F) -> TimerId
    where
        F: FnOnce(&mut C) -> Result<()> + 'static,
    {
        let id = self.shared.borrow_mut().push(seconds, Box::new(action));
        tracing::trace!(target: "timer", id = id.0, seconds, "scheduled");
        id
    }

    /// Run `immediate` now, then schedule `action` like [`schedule`](Self::schedule).
    ///
    /// If `immediate` fails nothing is scheduled and its error is returned.
    pub fn schedule_with_immediate<F, I>(
        &mut self,
        seconds: f32,
        action: F,
        immediate: I,
        ctx: &mut C,
    ) -> Result<TimerId>
    where
        F: FnOnce(&mut C) -> Result<()> + 'static,
        I: FnOnce(&mut C) -> Result<()>,
    {
        immediate(ctx)?;
        Ok(self.schedule(seconds, action))
    }

    /// Remove an entry that has not fired yet.
    ///
    /// Returns false if the id is unknown, typically because the action
    /// already fired.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let removed_pending = self.shared.borrow_mut().remove_pending(id);
        let before = self.active.len();
        self.active.retain(|e| e.id != id);
        let removed = removed_pending || self.active.len() != before;
        if removed {
            tracing::debug!(target: "timer", id = id.0, "cancelled");
        }
        removed
    }

    /// A weak handle for scheduling and cancelling from inside actions
    pub fn handle(&self) -> TimerHandle<C> {
        TimerHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Whether `id` is still waiting to fire
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        let shared = self.shared.borrow();
        if shared.cancelled.contains(&id) {
            return false;
        }
        self.active
            .iter()
            .chain(shared.pending.iter())
            .any(|e| e.id == id && e.action.is_some())
    }

    /// Number of entries waiting to fire, including the next-frame buffer
    pub fn len(&self) -> usize {
        self.active.len() + self.shared.borrow().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry without running it
    pub fn clear(&mut self) {
        self.active.clear();
        let mut shared = self.shared.borrow_mut();
        shared.pending.clear();
        shared.cancelled.clear();
    }

    /// Advance every entry by the clock's simulated delta.
    ///
    /// Order: merge entries added since the last pass, count down, fire the
    /// ones that crossed below zero, then sweep fired and cancelled entries.
    /// An action error stops the pass and is returned unchanged; entries
    /// fired before it are still swept.
    pub fn update(&mut self, clock: &dyn Clock, ctx: &mut C) -> Result<()> {
        {
            let mut shared = self.shared.borrow_mut();
            self.active.append(&mut shared.pending);
            if !shared.cancelled.is_empty() {
                let cancelled = std::mem::take(&mut shared.cancelled);
                self.active.retain(|e| !cancelled.contains(&e.id));
            }
        }

        let dt = clock.delta_time();
        let mut outcome = Ok(());

        for entry in &mut self.active {
            if self.shared.borrow().cancelled.contains(&entry.id) {
                entry.action = None;
                continue;
            }

            entry.remaining -= dt;
            if entry.remaining < 0.0 {
                if let Some(action) = entry.action.take() {
                    tracing::trace!(target: "timer", id = entry.id.0, "firing");
                    if let Err(err) = action(ctx) {
                        outcome = Err(err);
                        break;
                    }
                }
            }
        }

        let cancelled = std::mem::take(&mut self.shared.borrow_mut().cancelled);
        self.active
            .retain(|e| e.action.is_some() && !cancelled.contains(&e.id));

        outcome
    }
}

/// Weak reference to an [`EventTimer`], safe to capture inside its actions.
///
/// Operations on a handle whose timer was dropped are no-ops.
pub struct TimerHandle<C = ()> {
    shared: Weak<RefCell<Shared<C>>>,
}

impl<C> Clone for TimerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C> TimerHandle<C> {
    /// Schedule into the next-frame buffer. `None` if the timer is gone.
    pub fn schedule<F>(&self, seconds: f32, action: F) -> Option<TimerId>
    where
        F: FnOnce(&mut C) -> Result<()> + 'static,
    {
        let shared = self.shared.upgrade()?;
        let id = shared.borrow_mut().push(seconds, Box::new(action));
        Some(id)
    }

    /// Cancel an entry. Takes effect immediately, even mid-update.
    pub fn cancel(&self, id: TimerId) {
        if let Some(shared) = self.shared.upgrade() {
            let mut shared = shared.borrow_mut();
            if !shared.remove_pending(id) {
                shared.cancelled.push(id);
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::StepClock;
    use cinder_core::CinderError;

    fn frames(timer: &mut EventTimer<Vec<&'static str>>, log: &mut Vec<&'static str>, dt: f32, n: usize) {
        let clock = StepClock::new(dt);
        for _ in 0..n {
            timer.update(&clock, log).unwrap();
        }
    }

    #[test]
    fn fires_once_on_frame_past_delay() {
        let mut timer: EventTimer<Vec<&'static str>> = EventTimer::new();
        let mut log = Vec::new();
        timer.schedule(2.0, |log: &mut Vec<&'static str>| {
            log.push("a");
            Ok(())
        });

        let clock = StepClock::new(1.0);
        timer.update(&clock, &mut log).unwrap();
        assert!(log.is_empty());
        timer.update(&clock, &mut log).unwrap();
        assert!(log.is_empty(), "elapsed == delay must not fire");
        timer.update(&clock, &mut log).unwrap();
        assert_eq!(log, vec!["a"]);

        frames(&mut timer, &mut log, 1.0, 5);
        assert_eq!(log, vec!["a"]);
        assert!(timer.is_empty());
    }

    #[test]
    fn zero_delay_waits_for_next_pass() {
        let mut timer: EventTimer<u32> = EventTimer::new();
        let mut count = 0u32;
        timer.schedule(0.0, |c: &mut u32| {
            *c += 1;
            Ok(())
        });
        timer.update(&StepClock::new(0.0), &mut count).unwrap();
        assert_eq!(count, 0, "countdown at zero is not below zero");
        timer.update(&StepClock::new(0.01), &mut count).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn scheduling_from_an_action_lands_in_next_pass() {
        let mut timer: EventTimer<Vec<&'static str>> = EventTimer::new();
        let handle = timer.handle();
        timer.schedule(0.5, move |log: &mut Vec<&'static str>| {
            log.push("outer");
            handle.schedule(-1.0, |log: &mut Vec<&'static str>| {
                log.push("inner");
                Ok(())
            });
            Ok(())
        });

        let mut log = Vec::new();
        let clock = StepClock::new(1.0);
        timer.update(&clock, &mut log).unwrap();
        assert_eq!(log, vec!["outer"]);
        assert_eq!(timer.len(), 1);

        timer.update(&clock, &mut log).unwrap();
        assert_eq!(log, vec!["outer", "inner"]);

        timer.update(&clock, &mut log).unwrap();
        assert_eq!(log, vec!["outer", "inner"]);
    }

    #[test]
    fn immediate_runs_synchronously() {
        let mut timer: EventTimer<Vec<&'static str>> = EventTimer::new();
        let mut log: Vec<&'static str> = Vec::new();
        timer
            .schedule_with_immediate(
                0.1,
                |log: &mut Vec<&'static str>| {
                    log.push("later");
                    Ok(())
                },
                |log: &mut Vec<&'static str>| {
                    log.push("now");
                    Ok(())
                },
                &mut log,
            )
            .unwrap();
        assert_eq!(log, vec!["now"]);
        frames(&mut timer, &mut log, 0.2, 1);
        assert_eq!(log, vec!["now", "later"]);
    }

    #[test]
    fn failing_immediate_schedules_nothing() {
        let mut timer: EventTimer<()> = EventTimer::new();
        let result = timer.schedule_with_immediate(
            0.1,
            |_| Ok(()),
            |_| Err(CinderError::ActionFailed("nope".into())),
            &mut (),
        );
        assert!(result.is_err());
        assert!(timer.is_empty());
    }

    #[test]
    fn cancel_pending_and_active() {
        let mut timer: EventTimer<u32> = EventTimer::new();
        let mut count = 0;
        let a = timer.schedule(1.0, |c: &mut u32| {
            *c += 1;
            Ok(())
        });
        assert!(timer.is_scheduled(a));
        assert!(timer.cancel(a), "pending entries can be cancelled");
        assert!(!timer.is_scheduled(a));

        let b = timer.schedule(1.0, |c: &mut u32| {
            *c += 10;
            Ok(())
        });
        timer.update(&StepClock::new(0.5), &mut count).unwrap();
        assert!(timer.cancel(b));
        timer.update(&StepClock::new(1.0), &mut count).unwrap();
        assert_eq!(count, 0);

        assert!(!timer.cancel(b), "second cancel is a no-op");
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut timer: EventTimer<()> = EventTimer::new();
        let id = timer.schedule(0.0, |_| Ok(()));
        timer.update(&StepClock::new(0.1), &mut ()).unwrap();
        assert!(!timer.cancel(id));
    }

    #[test]
    fn handle_cancel_mid_pass_prevents_sibling() {
        let mut timer: EventTimer<Vec<&'static str>> = EventTimer::new();
        let handle = timer.handle();
        let victim = std::rc::Rc::new(std::cell::Cell::new(None));

        let slot = victim.clone();
        timer.schedule(0.0, move |log: &mut Vec<&'static str>| {
            log.push("first");
            if let Some(id) = slot.get() {
                handle.cancel(id);
            }
            Ok(())
        });
        let id = timer.schedule(0.0, |log: &mut Vec<&'static str>| {
            log.push("second");
            Ok(())
        });
        victim.set(Some(id));

        let mut log = Vec::new();
        frames(&mut timer, &mut log, 0.1, 2);
        assert_eq!(log, vec!["first"]);
        assert!(timer.is_empty());
    }

    #[test]
    fn action_error_propagates_and_fired_entries_are_swept() {
        let mut timer: EventTimer<u32> = EventTimer::new();
        timer.schedule(0.0, |c: &mut u32| {
            *c += 1;
            Ok(())
        });
        timer.schedule(0.0, |_| Err(CinderError::ActionFailed("bad".into())));
        timer.schedule(0.0, |c: &mut u32| {
            *c += 100;
            Ok(())
        });

        let mut count = 0;
        let err = timer.update(&StepClock::new(0.1), &mut count).unwrap_err();
        assert!(matches!(err, CinderError::ActionFailed(_)));
        assert_eq!(count, 1);
        assert_eq!(timer.len(), 1, "unvisited entry survives");

        timer.update(&StepClock::new(0.1), &mut count).unwrap();
        assert_eq!(count, 101);
    }

    #[test]
    fn handle_detaches_when_timer_dropped() {
        let timer: EventTimer<()> = EventTimer::new();
        let handle = timer.handle();
        assert!(handle.is_attached());
        drop(timer);
        assert!(!handle.is_attached());
        assert!(handle.schedule(1.0, |_| Ok(())).is_none());
    }

    #[test]
    fn frame_size_does_not_change_fire_count() {
        let mut timer: EventTimer<u32> = EventTimer::new();
        for i in 0..10 {
            timer.schedule(i as f32 * 0.25, |c: &mut u32| {
                *c += 1;
                Ok(())
            });
        }
        let mut count = 0;
        timer.update(&StepClock::new(100.0), &mut count).unwrap();
        assert_eq!(count, 10);
    }
}

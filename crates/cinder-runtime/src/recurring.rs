//! Actions repeated at a fixed frequency
//!
//! An entry fires every `frequency` simulated seconds until its [`Cutoff`] is
//! reached, then runs its completion action once and is swept. Large frame
//! steps fire several times in one update so the firing count does not
//! depend on frame rate.

use crate::clock::Clock;
use crate::timer::TimedAction;
use cinder_core::Result;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Smallest accepted frequency, in seconds between firings
pub const MIN_FREQUENCY: f32 = 0.001;

/// Slack added to a count cutoff's time equivalent to absorb float drift
pub const COUNT_EPSILON: f32 = 0.05;

/// Work run on every firing of a recurring entry
pub type RecurringAction<C> = Box<dyn FnMut(&mut C) -> Result<()>>;

/// When a recurring entry stops
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cutoff {
    /// Fire until cancelled
    Unbounded,
    /// Stop once this many simulated seconds have elapsed
    Duration(f32),
    /// Stop after this many firings
    Count(u32),
}

impl Cutoff {
    /// Negative durations (conventionally `-1`) mean unbounded
    pub fn from_duration(seconds: f32) -> Self {
        if seconds < 0.0 {
            Cutoff::Unbounded
        } else {
            Cutoff::Duration(seconds)
        }
    }

    /// Negative counts (conventionally `-1`) mean unbounded
    pub fn from_count(times: i64) -> Self {
        if times < 0 {
            Cutoff::Unbounded
        } else {
            Cutoff::Count(times.min(u32::MAX as i64) as u32)
        }
    }
}

/// Opaque identifier returned when a recurring action is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecurringId(u64);

struct RecurringEntry<C> {
    id: RecurringId,
    action: RecurringAction<C>,
    frequency: f32,
    /// Elapsed-time cutoff; `None` for unbounded entries
    end: Option<f32>,
    max_firings: Option<u64>,
    fired: u64,
    freq_timer: f32,
    end_timer: f32,
    on_complete: Option<TimedAction<C>>,
    active: bool,
}

impl<C> RecurringEntry<C> {
    fn new(
        id: RecurringId,
        action: RecurringAction<C>,
        frequency: f32,
        cutoff: Cutoff,
        on_complete: Option<TimedAction<C>>,
    ) -> Self {
        let frequency = frequency.max(MIN_FREQUENCY);
        let (end, max_firings) = match cutoff {
            Cutoff::Unbounded => (None, None),
            Cutoff::Duration(seconds) => (Some(seconds), None),
            Cutoff::Count(times) => (Some(times as f32 * frequency + COUNT_EPSILON), Some(u64::from(times))),
        };
        Self {
            id,
            action,
            frequency,
            end,
            max_firings,
            fired: 0,
            freq_timer: 0.0,
            end_timer: 0.0,
            on_complete,
            active: true,
        }
    }

    /// Advance one frame. Expiry is decided before firing: on the frame the
    /// cutoff is reached, catch-up firings due at or after the cutoff are
    /// dropped.
    fn step(&mut self, dt: f32, ctx: &mut C, shared: &RefCell<Shared<C>>) -> Result<()> {
        self.freq_timer += dt;
        self.end_timer += dt;

        let expiring = self.end.filter(|end| self.end_timer >= *end);
        let due = self.due_firings(expiring);
        if due > 0 {
            self.freq_timer = (self.freq_timer - due as f32 * self.frequency).max(0.0);
        }

        for _ in 0..due {
            self.fired = self.fired.saturating_add(1);
            (self.action)(ctx)?;

            if shared.borrow().cancelled.contains(&self.id) {
                self.active = false;
                return Ok(());
            }
        }

        if expiring.is_some() {
            self.active = false;
            tracing::debug!(target: "recurring", id = self.id.0, fired = self.fired, "completed");
            if let Some(done) = self.on_complete.take() {
                done(ctx)?;
            }
        }

        Ok(())
    }

    /// Firings owed this frame, counted without stepping the accumulator
    /// down one period at a time. The k-th firing is due at
    /// `end_timer - freq_timer + k * frequency`; on an expiring frame only
    /// firings due strictly before the cutoff count.
    fn due_firings(&self, expiring: Option<f32>) -> u64 {
        let mut due = (f64::from(self.freq_timer) / f64::from(self.frequency)).floor() as u64;

        if let Some(max) = self.max_firings {
            due = due.min(max.saturating_sub(self.fired));
        }
        if let Some(end) = expiring {
            let start = f64::from(self.end_timer) - f64::from(self.freq_timer);
            let room = f64::from(end) - start;
            let before_end = if room > 0.0 {
                ((room / f64::from(self.frequency)).ceil() as u64).saturating_sub(1)
            } else {
                0
            };
            due = due.min(before_end);
        }
        due
    }
}

struct Shared<C> {
    pending: Vec<RecurringEntry<C>>,
    cancelled: Vec<RecurringId>,
    next_id: u64,
}

impl<C> Shared<C> {
    fn push(
        &mut self,
        action: RecurringAction<C>,
        frequency: f32,
        cutoff: Cutoff,
        on_complete: Option<TimedAction<C>>,
    ) -> RecurringId {
        let id = RecurringId(self.next_id);
        self.next_id += 1;
        self.pending
            .push(RecurringEntry::new(id, action, frequency, cutoff, on_complete));
        id
    }

    fn remove_pending(&mut self, id: RecurringId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.id != id);
        self.pending.len() != before
    }
}

/// Runs actions repeatedly for a span of time or a number of firings
pub struct RecurringEvents<C = ()> {
    entries: Vec<RecurringEntry<C>>,
    shared: Rc<RefCell<Shared<C>>>,
}

impl<C> Default for RecurringEvents<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RecurringEvents<C> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            shared: Rc::new(RefCell::new(Shared {
                pending: Vec::new(),
                cancelled: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Fire `action` every `frequency` seconds until `cutoff`, then run
    /// `on_complete` once.
    ///
    /// `frequency` is clamped to [`MIN_FREQUENCY`]. The entry starts counting
    /// on the next update.
    pub fn schedule<F>(
        &mut self,
        action: F,
        frequency: f32,
        cutoff: Cutoff,
        on_complete: Option<TimedAction<C>>,
    ) -> RecurringId
    where
        F: FnMut(&mut C) -> Result<()> + 'static,
    {
        let id = self
            .shared
            .borrow_mut()
            .push(Box::new(action), frequency, cutoff, on_complete);
        tracing::trace!(target: "recurring", id = id.0, frequency, ?cutoff, "scheduled");
        id
    }

    /// Deactivate an entry. Its completion action does not run.
    pub fn cancel(&mut self, id: RecurringId) -> bool {
        let removed_pending = self.shared.borrow_mut().remove_pending(id);
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        removed_pending || self.entries.len() != before
    }

    pub fn handle(&self) -> RecurringHandle<C> {
        RecurringHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn is_active(&self, id: RecurringId) -> bool {
        let shared = self.shared.borrow();
        !shared.cancelled.contains(&id)
            && (self.entries.iter().any(|e| e.id == id && e.active)
                || shared.pending.iter().any(|e| e.id == id))
    }

    /// Number of firings so far, `None` once the entry is gone
    pub fn fired(&self, id: RecurringId) -> Option<u64> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.fired)
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.shared.borrow().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        let mut shared = self.shared.borrow_mut();
        shared.pending.clear();
        shared.cancelled.clear();
    }

    /// Advance every active entry by the clock's simulated delta, then sweep
    /// finished and cancelled entries. Errors from actions stop the pass and
    /// are returned unchanged.
    pub fn update(&mut self, clock: &dyn Clock, ctx: &mut C) -> Result<()> {
        {
            let mut shared = self.shared.borrow_mut();
            self.entries.append(&mut shared.pending);
            if !shared.cancelled.is_empty() {
                let cancelled = std::mem::take(&mut shared.cancelled);
                self.entries.retain(|e| !cancelled.contains(&e.id));
            }
        }

        let dt = clock.delta_time();
        let mut outcome = Ok(());

        for entry in &mut self.entries {
            if !entry.active {
                continue;
            }
            if self.shared.borrow().cancelled.contains(&entry.id) {
                entry.active = false;
                continue;
            }
            if let Err(err) = entry.step(dt, ctx, &self.shared) {
                outcome = Err(err);
                break;
            }
        }

        let cancelled = std::mem::take(&mut self.shared.borrow_mut().cancelled);
        self.entries
            .retain(|e| e.active && !cancelled.contains(&e.id));

        outcome
    }
}

/// Weak reference to a [`RecurringEvents`], safe to capture inside its actions
pub struct RecurringHandle<C = ()> {
    shared: Weak<RefCell<Shared<C>>>,
}

impl<C> Clone for RecurringHandle<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C> RecurringHandle<C> {
    pub fn schedule<F>(
        &self,
        action: F,
        frequency: f32,
        cutoff: Cutoff,
        on_complete: Option<TimedAction<C>>,
    ) -> Option<RecurringId>
    where
        F: FnMut(&mut C) -> Result<()> + 'static,
    {
        let shared = self.shared.upgrade()?;
        let id = shared
            .borrow_mut()
            .push(Box::new(action), frequency, cutoff, on_complete);
        Some(id)
    }

    /// Deactivate an entry immediately; safe from inside its own action
    pub fn cancel(&self, id: RecurringId) {
        if let Some(shared) = self.shared.upgrade() {
            let mut shared = shared.borrow_mut();
            if !shared.remove_pending(id) {
                shared.cancelled.push(id);
            }
        }
    }
}

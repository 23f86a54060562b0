//! Clip tasks: play/stop/pause/resume/restart after a delay

use crate::clip::{AudioClip, AudioTask};
use cinder_core::{CinderError, Result};
use cinder_runtime::{Clock, RuntimeSystem, Scene};

/// Runs once when the clip a task started reports completion
pub type CompletionAction = Box<dyn FnOnce() -> Result<()>>;

/// Which clock a task delay counts down on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelayTime {
    /// Scaled game time; frozen while paused
    #[default]
    Simulated,
    /// Wall-clock time
    Real,
}

/// Index of a clip inside an [`AudioSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(usize);

/// A pending operation on one clip
pub struct AudioClipTask {
    clip: ClipId,
    task: AudioTask,
    delay: f32,
    time: DelayTime,
    applied: bool,
    on_complete: Option<CompletionAction>,
}

impl AudioClipTask {
    pub fn new(clip: ClipId, task: AudioTask, delay: f32) -> Self {
        Self {
            clip,
            task,
            delay,
            time: DelayTime::Simulated,
            applied: false,
            on_complete: None,
        }
    }

    /// Count the delay down on the wall clock instead of game time
    pub fn real_time(mut self) -> Self {
        self.time = DelayTime::Real;
        self
    }

    pub fn on_complete<F>(mut self, action: F) -> Self
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.on_complete = Some(Box::new(action));
        self
    }

    pub fn clip(&self) -> ClipId {
        self.clip
    }

    pub fn task(&self) -> AudioTask {
        self.task
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Applied, and any completion action has run
    pub fn is_done(&self) -> bool {
        self.applied && self.on_complete.is_none()
    }

    fn apply(&mut self, clip: &mut dyn AudioClip) -> Result<()> {
        self.applied = true;
        self.task.apply(clip)
    }

    fn update(&mut self, clip: &mut dyn AudioClip, clock: &dyn Clock) -> Result<()> {
        if !self.applied {
            self.delay -= match self.time {
                DelayTime::Simulated => clock.delta_time(),
                DelayTime::Real => clock.real_delta_time(),
            };
            if self.delay < 0.0 {
                self.apply(clip)?;
            }
        }

        if self.applied && clip.is_completed() {
            if let Some(action) = self.on_complete.take() {
                tracing::debug!(target: "audio", clip = clip.name(), "clip completed");
                action()?;
            }
        }
        Ok(())
    }
}

/// Owns a set of clips and the tasks scheduled on them
#[derive(Default)]
pub struct AudioSource {
    clips: Vec<Box<dyn AudioClip>>,
    tasks: Vec<AudioClipTask>,
}

impl AudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, clip: Box<dyn AudioClip>) -> ClipId {
        self.clips.push(clip);
        ClipId(self.clips.len() - 1)
    }

    pub fn clip(&self, id: ClipId) -> Option<&dyn AudioClip> {
        self.clips.get(id.0).map(|c| c.as_ref())
    }

    pub fn clip_mut(&mut self, id: ClipId) -> Option<&mut (dyn AudioClip + 'static)> {
        self.clips.get_mut(id.0).map(|c| c.as_mut())
    }

    /// Number of tasks not yet finished
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Queue `task`. A delay of zero or less applies it right away.
    pub fn schedule(&mut self, mut task: AudioClipTask) -> Result<()> {
        let clip = self
            .clips
            .get_mut(task.clip.0)
            .ok_or_else(|| CinderError::AudioError(format!("unknown clip {:?}", task.clip)))?;

        if task.on_complete.is_some() && !clip.supports_completion_events() {
            tracing::warn!(
                target: "audio",
                clip = clip.name(),
                "clip does not report completion, completion action dropped"
            );
            task.on_complete = None;
        }

        if task.delay <= 0.0 {
            task.apply(clip.as_mut())?;
        }
        if !task.is_done() {
            self.tasks.push(task);
        }
        Ok(())
    }

    /// Count delays down, apply due tasks, fire completions and sweep
    /// finished tasks
    pub fn update(&mut self, clock: &dyn Clock) -> Result<()> {
        let mut failure = None;
        for task in &mut self.tasks {
            let Some(clip) = self.clips.get_mut(task.clip.0) else {
                continue;
            };
            if let Err(err) = task.update(clip.as_mut(), clock) {
                failure = Some(err);
                break;
            }
        }

        self.tasks.retain(|task| !task.is_done());

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl RuntimeSystem for AudioSource {
    fn initialize(&mut self, _scene: &mut dyn Scene) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, clock: &dyn Clock, _scene: &mut dyn Scene) -> Result<()> {
        AudioSource::update(self, clock)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.tasks.clear();
        for clip in &mut self.clips {
            clip.stop()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "audio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_runtime::{SceneGraph, StepClock};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct MockClip {
        log: Log,
        completed: Rc<Cell<bool>>,
        completion_events: bool,
        fail: bool,
    }

    impl MockClip {
        fn new(log: &Log) -> (Self, Rc<Cell<bool>>) {
            let completed = Rc::new(Cell::new(false));
            let clip = Self {
                log: log.clone(),
                completed: completed.clone(),
                completion_events: true,
                fail: false,
            };
            (clip, completed)
        }

        fn record(&mut self, op: &str) -> Result<()> {
            if self.fail {
                return Err(CinderError::AudioError(format!("{op} failed")));
            }
            self.log.borrow_mut().push(op.to_string());
            Ok(())
        }
    }

    impl AudioClip for MockClip {
        fn name(&self) -> &str {
            "mock"
        }
        fn play(&mut self) -> Result<()> {
            self.completed.set(false);
            self.record("play")
        }
        fn stop(&mut self) -> Result<()> {
            self.record("stop")
        }
        fn pause(&mut self) -> Result<()> {
            self.record("pause")
        }
        fn resume(&mut self) -> Result<()> {
            self.record("resume")
        }
        fn is_completed(&self) -> bool {
            self.completed.get()
        }
        fn supports_completion_events(&self) -> bool {
            self.completion_events
        }
    }

    fn source_with_clip() -> (AudioSource, ClipId, Log, Rc<Cell<bool>>) {
        let log = Log::default();
        let (clip, completed) = MockClip::new(&log);
        let mut source = AudioSource::new();
        let id = source.add_clip(Box::new(clip));
        (source, id, log, completed)
    }

    #[test]
    fn zero_delay_applies_immediately() {
        let (mut source, id, log, _) = source_with_clip();
        source.schedule(AudioClipTask::new(id, AudioTask::Play, 0.0)).unwrap();
        assert_eq!(*log.borrow(), ["play"]);
        assert_eq!(source.pending(), 0);
    }

    #[test]
    fn delay_counts_down_on_game_time() {
        let (mut source, id, log, _) = source_with_clip();
        source.schedule(AudioClipTask::new(id, AudioTask::Pause, 1.0)).unwrap();

        let clock = StepClock::new(0.5);
        source.update(&clock).unwrap();
        source.update(&clock).unwrap();
        assert!(log.borrow().is_empty());

        source.update(&clock).unwrap();
        assert_eq!(*log.borrow(), ["pause"]);
        assert_eq!(source.pending(), 0);
    }

    #[test]
    fn real_time_delay_ignores_pause() {
        let (mut source, id, log, _) = source_with_clip();
        source
            .schedule(AudioClipTask::new(id, AudioTask::Resume, 1.0).real_time())
            .unwrap();
        source.schedule(AudioClipTask::new(id, AudioTask::Stop, 1.0)).unwrap();

        // Game paused: no simulated time passes
        let clock = StepClock::split(0.0, 0.6);
        source.update(&clock).unwrap();
        source.update(&clock).unwrap();
        assert_eq!(*log.borrow(), ["resume"]);
        assert_eq!(source.pending(), 1);
    }

    #[test]
    fn completion_fires_once_then_task_is_swept() {
        let (mut source, id, log, completed) = source_with_clip();
        let fired = log.clone();
        source
            .schedule(
                AudioClipTask::new(id, AudioTask::Restart, 0.0).on_complete(move || {
                    fired.borrow_mut().push("done".to_string());
                    Ok(())
                }),
            )
            .unwrap();
        assert_eq!(*log.borrow(), ["stop", "play"]);

        let clock = StepClock::new(0.1);
        source.update(&clock).unwrap();
        assert_eq!(source.pending(), 1);

        completed.set(true);
        source.update(&clock).unwrap();
        source.update(&clock).unwrap();
        assert_eq!(*log.borrow(), ["stop", "play", "done"]);
        assert_eq!(source.pending(), 0);
    }

    #[test]
    fn completion_waits_for_delayed_task() {
        let (mut source, id, log, completed) = source_with_clip();
        completed.set(true);
        let fired = log.clone();
        source
            .schedule(AudioClipTask::new(id, AudioTask::Play, 0.5).on_complete(move || {
                fired.borrow_mut().push("done".to_string());
                Ok(())
            }))
            .unwrap();

        source.update(&StepClock::new(0.25)).unwrap();
        assert!(log.borrow().is_empty());

        source.update(&StepClock::new(0.5)).unwrap();
        assert_eq!(*log.borrow(), ["play"]);
    }

    #[test]
    fn completion_dropped_for_unsupported_clip() {
        let log = Log::default();
        let (mut clip, _) = MockClip::new(&log);
        clip.completion_events = false;
        let mut source = AudioSource::new();
        let id = source.add_clip(Box::new(clip));

        source
            .schedule(AudioClipTask::new(id, AudioTask::Play, 0.0).on_complete(|| Ok(())))
            .unwrap();
        assert_eq!(source.pending(), 0);
    }

    #[test]
    fn clip_errors_propagate() {
        let log = Log::default();
        let (mut clip, _) = MockClip::new(&log);
        clip.fail = true;
        let mut source = AudioSource::new();
        let id = source.add_clip(Box::new(clip));

        source.schedule(AudioClipTask::new(id, AudioTask::Play, 0.1)).unwrap();
        let err = source.update(&StepClock::new(0.5)).unwrap_err();
        assert!(matches!(err, CinderError::AudioError(_)));
        assert_eq!(source.pending(), 0);
    }

    #[test]
    fn unknown_clip_rejected() {
        let (mut source, _, _, _) = source_with_clip();
        let task = AudioClipTask::new(ClipId(7), AudioTask::Play, 0.0);
        assert!(source.schedule(task).is_err());
    }

    #[test]
    fn runs_as_runtime_system() {
        let (mut source, id, log, _) = source_with_clip();
        source.schedule(AudioClipTask::new(id, AudioTask::Play, 0.2)).unwrap();

        let mut scene = SceneGraph::new();
        let system: &mut dyn RuntimeSystem = &mut source;
        system.update(&StepClock::new(0.25), &mut scene).unwrap();
        assert_eq!(system.name(), "audio");
        system.shutdown().unwrap();
        assert_eq!(*log.borrow(), ["play", "stop"]);
    }
}

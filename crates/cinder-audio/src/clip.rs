//! The clip interface tasks act on

use cinder_core::Result;

/// A controllable piece of audio
pub trait AudioClip {
    fn name(&self) -> &str;

    fn play(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Play again from the start
    fn restart(&mut self) -> Result<()> {
        self.stop()?;
        self.play()
    }

    /// Whether playback has run to its end
    fn is_completed(&self) -> bool;

    /// Whether `is_completed` is meaningful for this clip (looping clips
    /// never complete)
    fn supports_completion_events(&self) -> bool {
        true
    }
}

/// Operation applied to a clip by an [`AudioClipTask`](crate::AudioClipTask)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTask {
    Play,
    Stop,
    Pause,
    Resume,
    Restart,
}

impl AudioTask {
    pub fn apply(self, clip: &mut dyn AudioClip) -> Result<()> {
        tracing::debug!(target: "audio", task = ?self, clip = clip.name(), "applying audio task");
        match self {
            AudioTask::Play => clip.play(),
            AudioTask::Stop => clip.stop(),
            AudioTask::Pause => clip.pause(),
            AudioTask::Resume => clip.resume(),
            AudioTask::Restart => clip.restart(),
        }
    }
}

//! Audio engine wrapping Kira's AudioManager
//!
//! Handles sound loading and hands out [`KiraClip`]s.
//! Degrades gracefully when no audio device is available.

use crate::clip::AudioClip;
use cinder_core::{CinderError, Result};
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::sound::PlaybackState;
use kira::{AudioManager, AudioManagerSettings, DefaultBackend, Tween};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

type SharedManager = Rc<RefCell<AudioManager<DefaultBackend>>>;

/// Short fade for stop/pause/resume (avoids clicks)
const FADE: Tween = Tween {
    duration: Duration::from_millis(16),
    easing: kira::Easing::Linear,
    start_time: kira::StartTime::Immediate,
};

/// Wraps Kira's AudioManager with a sound cache
pub struct AudioEngine {
    manager: Option<SharedManager>,
    sound_cache: HashMap<String, StaticSoundData>,
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine {
    pub fn new() -> Self {
        // Try to create the audio manager; run silent if there is no device
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| tracing::warn!(target: "audio", "no device available ({e}), running silent"))
            .ok()
            .map(|m| Rc::new(RefCell::new(m)));

        Self {
            manager,
            sound_cache: HashMap::new(),
        }
    }

    /// An engine that never opens a device
    pub fn silent() -> Self {
        Self {
            manager: None,
            sound_cache: HashMap::new(),
        }
    }

    /// Whether audio is actually available
    pub fn is_available(&self) -> bool {
        self.manager.is_some()
    }

    /// Load a sound file into the cache
    pub fn load_sound(&mut self, name: &str, path: &Path) -> Result<()> {
        if self.sound_cache.contains_key(name) {
            return Ok(());
        }

        let sound_data = StaticSoundData::from_file(path).map_err(|e| {
            CinderError::AudioError(format!("Failed to load '{}': {}", path.display(), e))
        })?;

        self.sound_cache.insert(name.to_string(), sound_data);
        Ok(())
    }

    /// Check if a sound is already loaded
    pub fn has_sound(&self, name: &str) -> bool {
        self.sound_cache.contains_key(name)
    }

    /// Build a clip for a cached sound
    pub fn clip(&self, sound_name: &str, volume: f64, looping: bool) -> Result<KiraClip> {
        let data = self
            .sound_cache
            .get(sound_name)
            .ok_or_else(|| CinderError::AudioError(format!("Sound not cached: {sound_name}")))?
            .clone();

        let mut data = data.volume(amplitude_to_db(volume));
        if looping {
            data = data.loop_region(..);
        }

        Ok(KiraClip {
            name: sound_name.to_string(),
            data,
            looping,
            manager: self.manager.clone(),
            handle: None,
            played: false,
        })
    }
}

/// A cached sound played through Kira. Without a device every operation
/// succeeds silently and the clip completes as soon as it is played.
pub struct KiraClip {
    name: String,
    data: StaticSoundData,
    looping: bool,
    manager: Option<SharedManager>,
    handle: Option<StaticSoundHandle>,
    played: bool,
}

impl AudioClip for KiraClip {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(&mut self) -> Result<()> {
        self.played = true;
        let Some(manager) = &self.manager else {
            return Ok(());
        };
        let handle = manager
            .borrow_mut()
            .play(self.data.clone())
            .map_err(|e| CinderError::AudioError(format!("Failed to play '{}': {e}", self.name)))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(handle) = &mut self.handle {
            let _ = handle.stop(FADE);
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(handle) = &mut self.handle {
            let _ = handle.pause(FADE);
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(handle) = &mut self.handle {
            let _ = handle.resume(FADE);
        }
        Ok(())
    }

    fn is_completed(&self) -> bool {
        match &self.handle {
            Some(handle) => handle.state() == PlaybackState::Stopped,
            None => self.played && self.manager.is_none(),
        }
    }

    fn supports_completion_events(&self) -> bool {
        !self.looping
    }
}

/// Convert linear amplitude (0.0–2.0) to decibels
fn amplitude_to_db(amplitude: f64) -> kira::Decibels {
    if amplitude <= 0.0 {
        kira::Decibels(-60.0) // silence
    } else {
        kira::Decibels((20.0 * (amplitude as f32).log10()).max(-60.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_conversion() {
        assert_eq!(amplitude_to_db(0.0).0, -60.0);
        assert!(amplitude_to_db(1.0).0.abs() < 1e-6);
        assert!((amplitude_to_db(0.5).0 + 6.0206).abs() < 1e-3);
    }

    #[test]
    fn silent_engine_rejects_uncached_sounds() {
        let engine = AudioEngine::silent();
        assert!(!engine.is_available());
        assert!(!engine.has_sound("blip"));
        assert!(matches!(engine.clip("blip", 1.0, false), Err(CinderError::AudioError(_))));
    }

    #[test]
    fn missing_file_is_an_audio_error() {
        let mut engine = AudioEngine::silent();
        let err = engine
            .load_sound("blip", Path::new("does/not/exist.ogg"))
            .unwrap_err();
        assert!(matches!(err, CinderError::AudioError(_)));
    }
}

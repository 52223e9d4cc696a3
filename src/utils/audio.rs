use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rodio::{source::Buffered, Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::{
    cell::{Cell, RefCell},
    fs,
    io::{Cursor, Error as IoError},
    path::{Path, PathBuf},
    rc::Rc,
};
use thiserror::Error;

use crate::config::audio::AudioConfig;
use crate::physics::events::{CollisionHandler, ImpactEvent};

// Error Types ==================================================

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),
    #[error("Audio device error: {0}")]
    DeviceError(String),
    #[error("Playback error: {0}")]
    PlaybackError(String),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
}

// Clip playback ================================================

/// A single voice that can (re)start one preloaded clip.
pub trait ClipPlayer {
    /// Starts the clip from time zero at `volume`, cutting off any playback
    /// still in progress on this voice.
    fn play_from_start(&mut self, volume: f32) -> Result<(), AudioError>;
}

type ClipSource = Buffered<Decoder<Cursor<Vec<u8>>>>;

/// Rodio-backed voice. The decoded clip is buffered once and cloned per play.
pub struct RodioClip {
    _stream: OutputStream, // Kept to prevent the stream from being dropped
    stream_handle: OutputStreamHandle,
    clip: ClipSource,
    sink: Option<Sink>,
}

impl RodioClip {
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AudioError::FileNotFound(path.to_path_buf()),
            _ => AudioError::IoError(e),
        })?;
        let clip = Decoder::new(Cursor::new(bytes))
            .map_err(|e| AudioError::InvalidFormat(e.to_string()))?
            .buffered();

        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceError(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            clip,
            sink: None,
        })
    }
}

impl ClipPlayer for RodioClip {
    fn play_from_start(&mut self, volume: f32) -> Result<(), AudioError> {
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| AudioError::PlaybackError(e.to_string()))?;
        sink.set_volume(volume);
        sink.append(self.clip.clone());
        // Dropping the previous sink stops whatever it was still playing.
        self.sink = Some(sink);
        Ok(())
    }
}

/// Voice used when no output device or clip is available.
#[derive(Debug, Default)]
pub struct SilentClip;

impl ClipPlayer for SilentClip {
    fn play_from_start(&mut self, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

// Hit sound ====================================================

/// The impact sound shared by every spawned device.
///
/// Only impacts strictly faster than `threshold` along the contact normal
/// are audible. Volume is drawn uniformly from `[0, max_volume)`.
pub struct HitSound {
    threshold: f32,
    max_volume: f32,
    player: RefCell<Box<dyn ClipPlayer>>,
    rng: RefCell<ChaCha8Rng>,
    last_volume: Cell<Option<f32>>,
}

impl HitSound {
    pub fn new(config: &AudioConfig, player: Box<dyn ClipPlayer>) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            threshold: config.impact_threshold,
            max_volume: config.max_volume,
            player: RefCell::new(player),
            rng: RefCell::new(rng),
            last_volume: Cell::new(None),
        }
    }

    /// Opens the configured clip on the default output device, falling back
    /// to a silent voice when either is unavailable.
    pub fn from_config(config: &AudioConfig) -> Self {
        let player: Box<dyn ClipPlayer> = if !config.enabled {
            Box::new(SilentClip)
        } else {
            match RodioClip::open(&config.hit_sound) {
                Ok(clip) => Box::new(clip),
                Err(e) => {
                    log::warn!("Hit sound disabled: {}", e);
                    Box::new(SilentClip)
                }
            }
        };
        Self::new(config, player)
    }

    /// Plays the clip if `impact_speed` clears the threshold. Returns the
    /// volume used, or `None` when the impact was too soft.
    pub fn trigger(&self, impact_speed: f32) -> Option<f32> {
        if impact_speed.is_nan() || impact_speed <= self.threshold {
            return None;
        }

        let volume = self.rng.borrow_mut().gen::<f32>() * self.max_volume;
        if let Err(e) = self.player.borrow_mut().play_from_start(volume) {
            log::warn!("Failed to play hit sound: {}", e);
        }
        self.last_volume.set(Some(volume));
        Some(volume)
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.last_volume.get()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Per-body collision listener that forwards impacts to the shared [`HitSound`].
pub struct HitSoundHandler {
    sound: Rc<HitSound>,
}

impl HitSoundHandler {
    pub fn new(sound: Rc<HitSound>) -> Self {
        Self { sound }
    }
}

impl CollisionHandler for HitSoundHandler {
    fn on_collide(&mut self, event: &ImpactEvent) {
        if let Some(volume) = self.sound.trigger(event.impact_speed) {
            log::trace!(
                "Impact {:.2} m/s on {:?}, volume {:.2}",
                event.impact_speed,
                event.body,
                volume
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every play request instead of touching an audio device.
    #[derive(Clone, Default)]
    pub struct RecordingClip {
        pub plays: Arc<Mutex<Vec<f32>>>,
    }

    impl ClipPlayer for RecordingClip {
        fn play_from_start(&mut self, volume: f32) -> Result<(), AudioError> {
            self.plays.lock().push(volume);
            Ok(())
        }
    }

    pub fn recording_sound(seed: u64) -> (HitSound, RecordingClip) {
        let clip = RecordingClip::default();
        let config = AudioConfig {
            seed: Some(seed),
            ..AudioConfig::default()
        };
        (HitSound::new(&config, Box::new(clip.clone())), clip)
    }

    #[test]
    fn test_soft_impact_is_silent() {
        let (sound, clip) = recording_sound(1);
        assert_eq!(sound.trigger(1.4), None);
        assert_eq!(sound.trigger(1.5), None);
        assert!(clip.plays.lock().is_empty());
    }

    #[test]
    fn test_hard_impact_plays_with_bounded_volume() {
        let (sound, clip) = recording_sound(7);
        for _ in 0..200 {
            let volume = sound.trigger(1.6).expect("impact above threshold");
            assert!((0.0..0.5).contains(&volume));
        }
        assert_eq!(clip.plays.lock().len(), 200);
    }

    #[test]
    fn test_last_trigger_wins() {
        let (sound, clip) = recording_sound(3);
        sound.trigger(4.0);
        let second = sound.trigger(2.0).unwrap();
        assert_eq!(sound.last_volume(), Some(second));
        assert_eq!(clip.plays.lock().last().copied(), Some(second));
    }

    #[test]
    fn test_nan_impact_is_silent() {
        let (sound, _) = recording_sound(5);
        assert_eq!(sound.trigger(f32::NAN), None);
    }

    #[test]
    fn test_handler_forwards_impacts() {
        let (sound, clip) = recording_sound(9);
        let mut handler = HitSoundHandler::new(Rc::new(sound));
        let body = rapier3d::prelude::RigidBodyHandle::from_raw_parts(0, 0);
        handler.on_collide(&ImpactEvent {
            body,
            other: None,
            impact_speed: 1.6,
        });
        handler.on_collide(&ImpactEvent {
            body,
            other: None,
            impact_speed: 0.2,
        });
        assert_eq!(clip.plays.lock().len(), 1);
    }
}

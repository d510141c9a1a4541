//! Session and engine configuration.

use serde::{Deserialize, Serialize};

use formcoach_audio::{CAPTURE_BLOCK_SAMPLES, CAPTURE_SAMPLE_RATE_HZ, PLAYBACK_SAMPLE_RATE_HZ};
use formcoach_core::{smoothing, Error, Result};
use formcoach_motion::DEFAULT_SCALE_M_PER_UNIT;

/// Per-session choices made by the user or the host app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Exercise to count; must exist in the catalog.
    pub exercise_id: String,

    /// Override for the normalized-units-to-meters velocity scale.
    pub scale_m_per_unit: Option<f64>,

    /// Associate detected objects with the wrists each frame.
    pub track_weighted_objects: bool,

    /// Forward rep completions to the coach as text cues.
    pub forward_rep_cues: bool,

    /// Camera frame size in pixels, for object association.
    pub frame_width_px: f64,
    pub frame_height_px: f64,
}

impl SessionConfig {
    pub fn new(exercise_id: &str) -> Self {
        Self {
            exercise_id: exercise_id.to_string(),
            scale_m_per_unit: None,
            track_weighted_objects: false,
            forward_rep_cues: true,
            frame_width_px: 1280.0,
            frame_height_px: 720.0,
        }
    }

    pub fn with_scale_m_per_unit(mut self, scale: f64) -> Self {
        self.scale_m_per_unit = Some(scale);
        self
    }

    pub fn with_weighted_objects(mut self, enabled: bool) -> Self {
        self.track_weighted_objects = enabled;
        self
    }

    pub fn with_rep_cues(mut self, enabled: bool) -> Self {
        self.forward_rep_cues = enabled;
        self
    }

    pub fn with_frame_size(mut self, width_px: f64, height_px: f64) -> Self {
        self.frame_width_px = width_px;
        self.frame_height_px = height_px;
        self
    }
}

/// App-level engine settings, shared by every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachSettings {
    pub audio: AudioSettings,
    pub motion: MotionSettings,

    /// Rep announcement template; `{n}` is the count, `{name}` the
    /// exercise display name.
    pub cue_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Microphone sample rate (Hz).
    pub capture_sample_rate_hz: u32,

    /// Synthesized speech sample rate (Hz).
    pub playback_sample_rate_hz: u32,

    /// Samples per capture block.
    pub capture_block_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionSettings {
    /// EMA coefficient for the rep metric.
    pub smoothing_alpha: f64,

    /// Normalized-units-to-meters velocity scale.
    pub scale_m_per_unit: f64,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            audio: AudioSettings {
                capture_sample_rate_hz: CAPTURE_SAMPLE_RATE_HZ,
                playback_sample_rate_hz: PLAYBACK_SAMPLE_RATE_HZ,
                capture_block_samples: CAPTURE_BLOCK_SAMPLES,
            },
            motion: MotionSettings {
                smoothing_alpha: smoothing::DEFAULT_ALPHA,
                scale_m_per_unit: DEFAULT_SCALE_M_PER_UNIT,
            },
            cue_template: "User did rep {n} of {name}".to_string(),
        }
    }
}

impl CoachSettings {
    /// Load settings from a file, with `FORMCOACH_*` environment overrides.
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FORMCOACH"))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Load settings from environment variables alone.
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("FORMCOACH"))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Render the rep announcement for one completed rep.
    pub fn render_cue(&self, count: u32, display_name: &str) -> String {
        self.cue_template
            .replace("{n}", &count.to_string())
            .replace("{name}", display_name)
    }
}

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    animator::{Animation, RowPulse, TravelingPulse},
    topology::{Note, PadTopology, TopologyError, Zone},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file")]
    Parse(#[from] serde_json::Error),
    #[error("invalid pad topology")]
    Topology(#[from] TopologyError),
    #[error("silence threshold {0} is outside [0, 1]")]
    SilenceThreshold(f32),
    #[error("hysteresis must be at least one pad")]
    Hysteresis,
    #[error("gain {0} must be a positive number")]
    Gain(f32),
    #[error("audio needs at least one channel and a non-zero sample rate")]
    AudioFormat,
    #[error("midi channel {0} is outside 0..=15")]
    MidiChannel(u8),
    #[error("animation interval must be non-zero")]
    Interval,
    #[error("falloff table is empty")]
    EmptyFalloff,
    #[error("row pulse bounds must satisfy 1 <= min <= max <= 127 (got {min}..={max})")]
    Bounds { min: u8, max: u8 },
    #[error("row pulse hold_frames must be at least one frame")]
    HoldFrames,
    #[error("row pulse step must be non-zero")]
    Step,
    #[error("midi output port name is empty")]
    EmptyPort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub midi: MidiConfig,
    pub topology: TopologyConfig,
    /// Minimum change in lit pad count before the bar is redrawn.
    pub hysteresis: usize,
    /// Loudness below which the silence animation takes over.
    pub silence_threshold: f32,
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; the host default when absent.
    pub device: Option<String>,
    pub channels: u16,
    pub sample_rate: u32,
    /// Applied to the block RMS before clamping to [0, 1].
    pub gain: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiConfig {
    pub port: String,
    /// Zero-based MIDI channel the pads listen on.
    pub channel: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    pub color: u8,
    pub pads: Vec<Note>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub zones: Vec<ZoneConfig>,
    /// Order the volume bar fills in. Zones concatenated when absent.
    pub order: Option<Vec<Note>>,
    /// Physical rows, used by the row pulse animation.
    pub rows: Option<Vec<Vec<Note>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub interval_ms: u64,
    pub style: AnimationStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimationStyle {
    TravelingPulse {
        /// Intensity by distance from the pulse head.
        falloff: Vec<u8>,
    },
    RowPulse {
        hold_frames: u32,
        min: u8,
        max: u8,
        step: u8,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            midi: MidiConfig::default(),
            topology: TopologyConfig::default(),
            hysteresis: 1,
            silence_threshold: 0.03,
            animation: AnimationConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            channels: 2,
            sample_rate: 44_100,
            gain: 5.0,
        }
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            port: "MIDIOUT2 (Launchkey MIDI) 2".into(),
            channel: 15,
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        const COLORS: [u8; 8] = [43, 42, 41, 50, 49, 52, 54, 53];
        const FIRST: [Note; 8] = [36, 37, 38, 39, 44, 45, 46, 47];

        // each zone is one column: a bottom pad and the pad four notes above it
        let zones = COLORS
            .iter()
            .zip(FIRST)
            .enumerate()
            .map(|(i, (&color, note))| ZoneConfig {
                name: format!("zone{}", i + 1),
                color,
                pads: vec![note, note + 4],
            })
            .collect();

        Self {
            zones,
            order: Some((36..52).collect()),
            rows: Some(vec![
                vec![40, 41, 42, 43, 48, 49, 50, 51],
                vec![36, 37, 38, 39, 44, 45, 46, 47],
            ]),
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 90,
            style: AnimationStyle::TravelingPulse {
                falloff: vec![53, 52, 49, 45, 41],
            },
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Checks every setting and builds the pad topology. Nothing touches a
    /// device until this has succeeded.
    pub fn validate(&self) -> Result<PadTopology, ConfigError> {
        if !(0.0..=1.0).contains(&self.silence_threshold) {
            return Err(ConfigError::SilenceThreshold(self.silence_threshold));
        }
        if self.hysteresis == 0 {
            return Err(ConfigError::Hysteresis);
        }
        if !(self.audio.gain.is_finite() && self.audio.gain > 0.0) {
            return Err(ConfigError::Gain(self.audio.gain));
        }
        if self.audio.channels == 0 || self.audio.sample_rate == 0 {
            return Err(ConfigError::AudioFormat);
        }
        if self.midi.channel > 15 {
            return Err(ConfigError::MidiChannel(self.midi.channel));
        }
        if self.midi.port.trim().is_empty() {
            return Err(ConfigError::EmptyPort);
        }
        if self.animation.interval_ms == 0 {
            return Err(ConfigError::Interval);
        }

        match &self.animation.style {
            AnimationStyle::TravelingPulse { falloff } => {
                if falloff.is_empty() {
                    return Err(ConfigError::EmptyFalloff);
                }
                if let Some(&v) = falloff.iter().find(|&&v| v > 127) {
                    return Err(TopologyError::OutOfRange(v).into());
                }
            }
            &AnimationStyle::RowPulse {
                hold_frames,
                min,
                max,
                step,
            } => {
                // zero intensity is a note-off, so min must still light the pad
                if min == 0 || min > max || max > 127 {
                    return Err(ConfigError::Bounds { min, max });
                }
                if hold_frames == 0 {
                    return Err(ConfigError::HoldFrames);
                }
                if step == 0 {
                    return Err(ConfigError::Step);
                }
            }
        }

        let zones = self
            .topology
            .zones
            .iter()
            .map(|z| Zone {
                name: z.name.clone(),
                color: z.color,
                pads: z.pads.clone(),
            })
            .collect();

        Ok(PadTopology::new(
            zones,
            self.topology.order.clone(),
            self.topology.rows.clone(),
        )?)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.animation.interval_ms)
    }

    /// The configured silence animation for `topology`.
    pub fn animation(&self, topology: &PadTopology) -> Box<dyn Animation> {
        match &self.animation.style {
            AnimationStyle::TravelingPulse { falloff } => {
                Box::new(TravelingPulse::new(topology.len(), falloff.clone()))
            }
            &AnimationStyle::RowPulse {
                hold_frames,
                min,
                max,
                step,
            } => Box::new(RowPulse::new(
                topology.rows().to_vec(),
                hold_frames,
                min,
                max,
                step,
            )),
        }
    }
}

//! JSON mix documents.
//!
//! A document lists mixes in the order they are applied. Each entry is an
//! externally tagged object naming a primitive command or a macro:
//!
//! ```json
//! { "virtual_channel": false,
//!   "mixes": [ {"Swap": {"dst": 0, "src": 1}},
//!              {"Volume": {"channel": null, "volume": "-6db"}},
//!              {"Layer": {"max": 2, "mask": 0, "mode": "b"}} ] }
//! ```
//!
//! Channels are zero-based and refer to the channel layout at that point of
//! the list. Volumes take plain numbers or dB strings.

use std::fmt;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::dsp::fade::{FadeEnvelope, FadeShape};
use crate::mixing::{ChannelTarget, LayerMode, MixError, MixingState};
use crate::stream::StreamContext;

mod error;
pub mod level;

pub use error::SettingsError;

use level::{deserialize_open_bound, deserialize_volume};

/// One entry of a mix document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MixSetting {
    Swap {
        dst: usize,
        src: usize,
    },
    Add {
        dst: usize,
        src: usize,
        #[serde(deserialize_with = "deserialize_volume")]
        volume: f32,
    },
    /// `channel: null` applies to every channel.
    Volume {
        #[serde(default)]
        channel: Option<usize>,
        #[serde(deserialize_with = "deserialize_volume")]
        volume: f32,
    },
    Limit {
        #[serde(default)]
        channel: Option<usize>,
        #[serde(deserialize_with = "deserialize_volume")]
        ceiling: f32,
    },
    Upmix {
        dst: usize,
    },
    Downmix {
        dst: usize,
    },
    Killmix {
        dst: usize,
    },
    Fade {
        #[serde(default)]
        channel: Option<usize>,
        #[serde(deserialize_with = "deserialize_volume")]
        vol_start: f32,
        #[serde(deserialize_with = "deserialize_volume")]
        vol_end: f32,
        #[serde(default)]
        shape: FadeShape,
        #[serde(default, deserialize_with = "deserialize_open_bound")]
        pre: Option<i64>,
        start: i64,
        end: i64,
        #[serde(default, deserialize_with = "deserialize_open_bound")]
        post: Option<i64>,
    },
    /// Volume on the channels selected by a bit mask (0 = all).
    VolumeMask {
        #[serde(deserialize_with = "deserialize_volume")]
        volume: f32,
        #[serde(default)]
        mask: u32,
    },
    Track {
        mask: u32,
    },
    Layer {
        max: usize,
        #[serde(default)]
        mask: u32,
        #[serde(default)]
        mode: LayerMode,
    },
    Crosstrack {
        max: usize,
    },
    Crosslayer {
        max: usize,
        #[serde(default)]
        mode: LayerMode,
    },
}

impl MixSetting {
    /// Append this entry to `state`.
    pub fn apply<S>(&self, state: &mut MixingState, stream: &mut S) -> Result<(), MixError>
    where
        S: StreamContext + ?Sized,
    {
        match *self {
            MixSetting::Swap { dst, src } => state.push_swap(dst, src),
            MixSetting::Add { dst, src, volume } => state.push_add(dst, src, volume),
            MixSetting::Volume { channel, volume } => {
                state.push_volume(ChannelTarget::from_index(channel), volume)
            }
            MixSetting::Limit { channel, ceiling } => {
                state.push_limit(ChannelTarget::from_index(channel), ceiling)
            }
            MixSetting::Upmix { dst } => state.push_upmix(dst),
            MixSetting::Downmix { dst } => state.push_downmix(dst),
            MixSetting::Killmix { dst } => state.push_killmix(dst),
            MixSetting::Fade {
                channel,
                vol_start,
                vol_end,
                shape,
                pre,
                start,
                end,
                post,
            } => state.push_fade(
                ChannelTarget::from_index(channel),
                FadeEnvelope {
                    vol_start,
                    vol_end,
                    shape,
                    pre,
                    start,
                    end,
                    post,
                },
            ),
            MixSetting::VolumeMask { volume, mask } => state.macro_volume(volume, mask),
            MixSetting::Track { mask } => state.macro_track(mask),
            MixSetting::Layer { max, mask, mode } => state.macro_layer(max, mask, mode),
            MixSetting::Crosstrack { max } => state.macro_crosstrack(max, stream),
            MixSetting::Crosslayer { max, mode } => state.macro_crosslayer(max, mode, stream),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MixSetting::Swap { .. } => "Swap",
            MixSetting::Add { .. } => "Add",
            MixSetting::Volume { .. } => "Volume",
            MixSetting::Limit { .. } => "Limit",
            MixSetting::Upmix { .. } => "Upmix",
            MixSetting::Downmix { .. } => "Downmix",
            MixSetting::Killmix { .. } => "Killmix",
            MixSetting::Fade { .. } => "Fade",
            MixSetting::VolumeMask { .. } => "VolumeMask",
            MixSetting::Track { .. } => "Track",
            MixSetting::Layer { .. } => "Layer",
            MixSetting::Crosstrack { .. } => "Crosstrack",
            MixSetting::Crosslayer { .. } => "Crosslayer",
        }
    }
}

/// Outcome of applying a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub rejected: usize,
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} applied, {} rejected", self.applied, self.rejected)
    }
}

/// A complete mix document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixSettingsFile {
    /// The decoded stream carries one synthetic channel past its native
    /// layout.
    #[serde(default)]
    pub virtual_channel: bool,
    #[serde(default)]
    pub mixes: Vec<MixSetting>,
}

impl MixSettingsFile {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Sample document touching every entry kind a stereo pair setup uses.
    pub fn example() -> Self {
        Self {
            virtual_channel: false,
            mixes: vec![
                MixSetting::Swap { dst: 0, src: 1 },
                MixSetting::Add {
                    dst: 0,
                    src: 2,
                    volume: 0.5,
                },
                MixSetting::Volume {
                    channel: None,
                    volume: 0.5,
                },
                MixSetting::Limit {
                    channel: Some(1),
                    ceiling: 0.9,
                },
                MixSetting::Fade {
                    channel: None,
                    vol_start: 1.0,
                    vol_end: 0.0,
                    shape: FadeShape::Exponential,
                    pre: None,
                    start: 441_000,
                    end: 882_000,
                    post: None,
                },
                MixSetting::Layer {
                    max: 2,
                    mask: 0,
                    mode: LayerMode::Bgm,
                },
            ],
        }
    }

    /// Apply every entry in order. Rejected entries are logged and skipped.
    pub fn apply<S>(&self, state: &mut MixingState, stream: &mut S) -> ApplyReport
    where
        S: StreamContext + ?Sized,
    {
        let mut report = ApplyReport::default();

        if self.virtual_channel {
            state.add_virtual_channel();
        }

        for (index, mix) in self.mixes.iter().enumerate() {
            match mix.apply(state, stream) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!("skipping mix #{} ({}): {}", index, mix.name(), err);
                    report.rejected += 1;
                }
            }
        }

        info!("mix settings: {}", report);
        report
    }
}

//! Composite behaviors expanded into primitive commands.
//!
//! A macro checks its own preconditions and returns an error if they fail.
//! Past that point it emits primitives through the builder; a primitive that
//! gets rejected is logged there and skipped, and the macro carries on.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dsp::fade::{FadeEnvelope, FadeShape};
use crate::stream::StreamContext;

use super::builder::log_rejection;
use super::command::ChannelTarget;
use super::error::MixError;
use super::state::MixingState;

/// Seconds a cross-track change takes.
const CROSSTRACK_SECONDS: i64 = 15;
/// Seconds a cross-layer change takes.
const CROSSLAYER_SECONDS: i64 = 10;

/// How layered channels are weighted when folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayerMode {
    /// Same volume for every layer, for layered vocals.
    #[default]
    Vocals,
    /// Main channels kept a bit louder than the rest, for layered bgm.
    Bgm,
    /// Equal power for every layer, for generic downmixing.
    Equal,
}

impl LayerMode {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'v' => Some(LayerMode::Vocals),
            'b' => Some(LayerMode::Bgm),
            'e' => Some(LayerMode::Equal),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            LayerMode::Vocals => 'v',
            LayerMode::Bgm => 'b',
            LayerMode::Equal => 'e',
        }
    }
}

impl TryFrom<String> for LayerMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        let mut chars = trimmed.chars();
        if let (Some(code), None) = (chars.next(), chars.next()) {
            if let Some(mode) = LayerMode::from_code(code) {
                return Ok(mode);
            }
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "vocals" => Ok(LayerMode::Vocals),
            "bgm" => Ok(LayerMode::Bgm),
            "equal" => Ok(LayerMode::Equal),
            _ => Err(format!("unknown layer mode \"{}\"", value)),
        }
    }
}

impl From<LayerMode> for String {
    fn from(value: LayerMode) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for LayerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

fn is_selected(mask: u32, channel: usize) -> bool {
    u32::try_from(channel)
        .ok()
        .and_then(|shift| mask.checked_shr(shift))
        .map_or(false, |bits| bits & 1 == 1)
}

/// Volume for the `current` output lane of a layer downmix.
///
/// Earlier lanes receive more sources than later ones when the selection
/// does not divide evenly (8 sources into 3 lanes: 0+3+6, 1+4+7, 2+5).
fn layer_volume(
    mode: LayerMode,
    channel: usize,
    current: usize,
    selected: usize,
    max: usize,
) -> f32 {
    let selected = selected as i64;
    let max = max as i64;
    let current = current as i64;

    let mixes = match mode {
        LayerMode::Vocals => return 1.0,
        LayerMode::Bgm if (channel as i64) < max => {
            // main channels: one mix less than the equal weighting
            let mut mixes = selected / max;
            if matches!(selected.checked_rem(mixes * max), Some(rest) if current < rest) {
                mixes += 1;
            }
            mixes -= 1;
            mixes.max(1)
        }
        LayerMode::Bgm | LayerMode::Equal => {
            let mut mixes = (selected / max).max(1);
            if current < selected % (mixes * max) {
                mixes += 1;
            }
            mixes
        }
    };
    1.0 / (mixes as f32).sqrt()
}

fn crossfade(vol_start: f32, vol_end: f32, start: i64, duration: i64) -> FadeEnvelope {
    FadeEnvelope {
        vol_start,
        vol_end,
        shape: FadeShape::RaisedCosine,
        pre: None,
        start,
        end: start + duration,
        post: None,
    }
}

impl MixingState {
    /// Scale the channels selected by `mask` (bit N = channel N), or every
    /// channel when `mask` is 0.
    pub fn macro_volume(&mut self, volume: f32, mask: u32) -> Result<(), MixError> {
        self.ensure_configurable()?;

        if mask == 0 {
            let _ = self.push_volume(ChannelTarget::All, volume);
            return Ok(());
        }

        for ch in 0..self.chain.output_channels() {
            if is_selected(mask, ch) {
                let _ = self.push_volume(ChannelTarget::Channel(ch), volume);
            }
        }
        Ok(())
    }

    /// Keep only the channels selected by `mask`. A zero mask keeps all.
    pub fn macro_track(&mut self, mask: u32) -> Result<(), MixError> {
        self.ensure_configurable()?;

        if mask == 0 {
            return Ok(());
        }

        // highest first so the remaining indices stay put
        for ch in (0..self.chain.output_channels()).rev() {
            if !is_selected(mask, ch) {
                let _ = self.push_downmix(ch);
            }
        }
        Ok(())
    }

    /// Fold the channels selected by `mask` into `max` channels.
    ///
    /// Sources are assigned round-robin, so with `max = 2` channel 0 gets
    /// sources 0, 2, 4... and channel 1 gets 1, 3, 5...
    pub fn macro_layer(
        &mut self,
        max: usize,
        mask: u32,
        mode: LayerMode,
    ) -> Result<(), MixError> {
        self.ensure_configurable()?;
        self.check_group_size(max)?;

        let mask = if mask == 0 { u32::MAX } else { mask };
        let output_channels = self.chain.output_channels();
        let selected = (0..output_channels)
            .filter(|&ch| is_selected(mask, ch))
            .count();
        debug!(
            "layer macro: {} of {} channel(s) into {} ({})",
            selected, output_channels, max, mode
        );

        // scratch lanes in front; sources now live at max + ch
        for _ in 0..max {
            let _ = self.push_upmix(0);
        }

        let mut current = 0;
        for ch in (0..output_channels).filter(|&ch| is_selected(mask, ch)) {
            let volume = layer_volume(mode, ch, current, selected, max);
            let _ = self.push_add(current, max + ch, volume);
            current = (current + 1) % max;
        }

        let _ = self.push_killmix(max);
        Ok(())
    }

    /// Switch between groups of `max` channels each time the loop restarts,
    /// crossfading over 15 seconds.
    ///
    /// Raises the stream's configured loop count so every group gets played.
    pub fn macro_crosstrack<S>(&mut self, max: usize, stream: &mut S) -> Result<(), MixError>
    where
        S: StreamContext + ?Sized,
    {
        self.ensure_configurable()?;
        self.check_group_size(max)?;
        let output_channels = self.prepare_cross(stream)?;

        let track_num = output_channels / max;
        raise_loop_count(stream, track_num);

        let loop_start = stream.loop_start_sample();
        let loop_len = stream.loop_length();
        let change_time = CROSSTRACK_SECONDS * i64::from(stream.sample_rate());
        debug!(
            "crosstrack macro: {} track(s) of {} channel(s), {} sample crossfade",
            track_num, max, change_time
        );

        for track in 0..track_num {
            let change_pos = loop_start + loop_len * track as i64;
            let change_next = loop_start + loop_len * (track as i64 + 1);

            for track_ch in 0..max {
                let target = ChannelTarget::Channel(track * max + track_ch);
                if track > 0 {
                    let _ = self.push_fade(target, crossfade(0.0, 1.0, change_pos, change_time));
                }
                if track + 1 < track_num {
                    let _ = self.push_fade(target, crossfade(1.0, 0.0, change_next, change_time));
                }
            }
        }

        self.sum_into_first(max, output_channels);
        Ok(())
    }

    /// Bring in one more group of `max` channels each time the loop
    /// restarts, fading over 10 seconds, until every layer plays together.
    ///
    /// Raises the stream's configured loop count so every layer gets heard.
    pub fn macro_crosslayer<S>(
        &mut self,
        max: usize,
        mode: LayerMode,
        stream: &mut S,
    ) -> Result<(), MixError>
    where
        S: StreamContext + ?Sized,
    {
        self.ensure_configurable()?;
        self.check_group_size(max)?;
        let output_channels = self.prepare_cross(stream)?;

        let layer_num = output_channels / max;
        raise_loop_count(stream, layer_num);

        let loop_start = stream.loop_start_sample();
        let loop_len = stream.loop_length();
        let change_time = CROSSLAYER_SECONDS * i64::from(stream.sample_rate());
        debug!(
            "crosslayer macro: {} layer(s) of {} channel(s) ({})",
            layer_num, max, mode
        );

        // 'e' and 'b' step the volume of playing layers down each loop so
        // the total stays about constant; 'b' keeps the first layer a loop
        // behind the others
        for loop_index in 1..layer_num {
            let change_pos = loop_start + loop_len * loop_index as i64;
            let step = |n: usize| 1.0 / (n.max(1) as f32).sqrt();

            for layer in 0..=loop_index {
                let (vol_from, vol_to) = match mode {
                    LayerMode::Vocals => (1.0, 1.0),
                    LayerMode::Equal => (step(loop_index), step(loop_index + 1)),
                    LayerMode::Bgm if layer == 0 => (step(loop_index - 1), step(loop_index)),
                    LayerMode::Bgm => (step(loop_index), step(loop_index + 1)),
                };
                // the newest layer comes in from silence
                let vol_from = if layer == loop_index { 0.0 } else { vol_from };

                for layer_ch in 0..max {
                    let target = ChannelTarget::Channel(layer * max + layer_ch);
                    let _ = self.push_fade(
                        target,
                        crossfade(vol_from, vol_to, change_pos, change_time),
                    );
                }
            }
        }

        self.sum_into_first(max, output_channels);
        Ok(())
    }

    fn ensure_configurable(&self) -> Result<(), MixError> {
        if self.activated {
            return Err(log_rejection(MixError::Activated));
        }
        Ok(())
    }

    fn check_group_size(&self, max: usize) -> Result<(), MixError> {
        let channels = self.chain.output_channels();
        if max == 0 || channels <= max {
            return Err(log_rejection(MixError::InvalidGroupSize { max, channels }));
        }
        Ok(())
    }

    /// Loop check and even-width padding shared by the cross macros.
    fn prepare_cross<S>(&mut self, stream: &S) -> Result<usize, MixError>
    where
        S: StreamContext + ?Sized,
    {
        if !stream.loop_flag() {
            return Err(log_rejection(MixError::NotLooping));
        }

        let output_channels = self.chain.output_channels();
        if output_channels % 2 == 0 {
            return Ok(output_channels);
        }
        match self.push_upmix(output_channels) {
            Ok(()) => Ok(output_channels + 1),
            Err(_) => Ok(output_channels),
        }
    }

    /// Add every channel past `max` into the first `max`, round-robin, then
    /// drop the rest.
    fn sum_into_first(&mut self, max: usize, output_channels: usize) {
        for ch in max..output_channels {
            let _ = self.push_add(ch % max, ch, 1.0);
        }
        let _ = self.push_killmix(max);
    }
}

fn raise_loop_count<S>(stream: &mut S, groups: usize)
where
    S: StreamContext + ?Sized,
{
    let groups = u32::try_from(groups).unwrap_or(u32::MAX);
    if stream.config_loop_count() < groups {
        debug!(
            "raising loop count from {} to {}",
            stream.config_loop_count(),
            groups
        );
        stream.set_config_loop_count(groups);
    }
}

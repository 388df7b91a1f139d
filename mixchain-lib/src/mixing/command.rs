//! Mix command model.

use std::fmt;

use crate::dsp::fade::FadeEnvelope;

/// Lane selector for commands that can apply to every channel at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelTarget {
    All,
    Channel(usize),
}

impl ChannelTarget {
    /// Build a target from an optional index, `None` meaning all channels.
    pub fn from_index(index: Option<usize>) -> Self {
        index.map_or(ChannelTarget::All, ChannelTarget::Channel)
    }
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::All => write!(f, "all"),
            ChannelTarget::Channel(ch) => write!(f, "{}", ch + 1),
        }
    }
}

/// One instruction of a mix chain.
///
/// Channel indices are relative to the chain width at the point the command
/// was appended: an earlier `Upmix`/`Downmix`/`Killmix` shifts the meaning of
/// every index after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixCommand {
    /// Exchange two lanes.
    Swap { dst: usize, src: usize },
    /// `dst += src * volume`.
    Add { dst: usize, src: usize, volume: f32 },
    /// Scale one lane or all active lanes.
    Volume { target: ChannelTarget, volume: f32 },
    /// Clamp one lane or all active lanes to `ceiling` times full scale.
    Limit { target: ChannelTarget, ceiling: f32 },
    /// Insert a silent lane at `dst`, pushing later lanes outward.
    Upmix { dst: usize },
    /// Remove lane `dst`, pulling later lanes inward.
    Downmix { dst: usize },
    /// Drop every lane from `dst` on.
    Killmix { dst: usize },
    /// Apply a time-windowed gain envelope.
    Fade {
        target: ChannelTarget,
        envelope: FadeEnvelope,
    },
}

impl MixCommand {
    /// Channel width after this command, given the width before it.
    pub fn resulting_channels(&self, channels: usize) -> usize {
        match self {
            MixCommand::Upmix { .. } => channels + 1,
            MixCommand::Downmix { .. } => channels.saturating_sub(1),
            MixCommand::Killmix { dst } => *dst,
            _ => channels,
        }
    }
}

fn write_bound(f: &mut fmt::Formatter<'_>, bound: Option<i64>, open: &str) -> fmt::Result {
    match bound {
        Some(value) => write!(f, "{}", value),
        None => write!(f, "{}", open),
    }
}

impl fmt::Display for MixCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixCommand::Swap { dst, src } => write!(f, "{}-{}", dst + 1, src + 1),
            MixCommand::Add { dst, src, volume } => {
                write!(f, "{}+{}*{}", dst + 1, src + 1, volume)
            }
            MixCommand::Volume { target, volume } => write!(f, "{}*{}", target, volume),
            MixCommand::Limit { target, ceiling } => write!(f, "{}={}", target, ceiling),
            MixCommand::Upmix { dst } => write!(f, "{}u", dst + 1),
            MixCommand::Downmix { dst } => write!(f, "{}d", dst + 1),
            MixCommand::Killmix { dst } => write!(f, "{}k", dst + 1),
            MixCommand::Fade { target, envelope } => {
                write!(
                    f,
                    "{}^{}~{}={}@",
                    target, envelope.vol_start, envelope.vol_end, envelope.shape
                )?;
                write_bound(f, envelope.pre, "pre")?;
                write!(f, "~{}~{}~", envelope.start, envelope.end)?;
                write_bound(f, envelope.post, "post")
            }
        }
    }
}

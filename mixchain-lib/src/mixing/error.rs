use std::fmt::{Display, Formatter};

/// Reason a mix command or macro was not added to the chain.
///
/// Rejections never leave the chain partially modified; the stream keeps
/// playing with whatever was configured before.
#[derive(Debug, Clone, PartialEq)]
pub enum MixError {
    /// The chain was activated and no longer accepts structural changes.
    Activated,
    /// The chain already holds the maximum number of commands.
    ChainFull(usize),
    /// A channel index is out of range for the chain's current width.
    InvalidChannel { channel: usize, channels: usize },
    /// Source and destination refer to the same channel.
    SameChannel(usize),
    /// The volume would leave the signal untouched.
    NoOpVolume(f32),
    /// The volume is outside the accepted range for the command.
    InvalidVolume(f32),
    /// Adding a channel would exceed the channel ceiling.
    ChannelLimit(usize),
    /// Removing a channel would leave the stream without channels.
    LastChannel,
    /// Fade boundaries are not ordered `pre <= start <= end <= post`.
    InvalidFadeTiming,
    /// A macro was given a channel group size it cannot work with.
    InvalidGroupSize { max: usize, channels: usize },
    /// A loop-driven macro was used on a stream without loop points.
    NotLooping,
}

impl Display for MixError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activated => write!(f, "mixing already active, ignoring new mixes"),
            Self::ChainFull(max) => write!(f, "too many mixes (max {})", max),
            Self::InvalidChannel { channel, channels } => {
                write!(f, "channel {} out of range for {} channel(s)", channel, channels)
            }
            Self::SameChannel(channel) => write!(f, "channel {} mixed with itself", channel),
            Self::NoOpVolume(volume) => write!(f, "volume {} has no effect", volume),
            Self::InvalidVolume(volume) => write!(f, "invalid volume {}", volume),
            Self::ChannelLimit(max) => write!(f, "channel limit of {} reached", max),
            Self::LastChannel => write!(f, "cannot remove the last channel"),
            Self::InvalidFadeTiming => write!(f, "fade times are out of order"),
            Self::InvalidGroupSize { max, channels } => {
                write!(f, "group size {} does not fit {} channel(s)", max, channels)
            }
            Self::NotLooping => write!(f, "stream has no loop"),
        }
    }
}

impl std::error::Error for MixError {}

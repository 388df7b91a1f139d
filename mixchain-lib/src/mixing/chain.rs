//! Ordered, bounded list of mix commands with running channel bookkeeping.

use log::debug;

use crate::dsp::fade::FadeEnvelope;

use super::command::{ChannelTarget, MixCommand};
use super::error::MixError;

/// Maximum number of commands a chain accepts.
pub const MAX_MIXES: usize = 128;

/// Commands in application order.
///
/// `mixing_channels` is the widest a frame ever gets while the chain runs and
/// sizes the working buffer. `output_channels` is the width after the last
/// command. Both are updated on every append and never recomputed.
#[derive(Debug, Clone)]
pub struct MixChain {
    commands: Vec<MixCommand>,
    mixing_channels: usize,
    output_channels: usize,
}

impl MixChain {
    /// Create an empty chain for a stream of `channels` channels.
    pub fn new(channels: usize) -> Self {
        Self {
            commands: Vec::with_capacity(MAX_MIXES),
            mixing_channels: channels,
            output_channels: channels,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.commands.len() >= MAX_MIXES
    }

    pub fn commands(&self) -> &[MixCommand] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MixCommand> {
        self.commands.iter()
    }

    /// Peak channel width needed while mixing.
    pub fn mixing_channels(&self) -> usize {
        self.mixing_channels
    }

    /// Channel width after every command so far.
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Widen both counters by one for a stream carrying a synthetic extra
    /// channel.
    pub(crate) fn add_virtual_channel(&mut self) {
        self.mixing_channels += 1;
        self.output_channels += 1;
    }

    /// Append an already validated command and update the width counters.
    pub(crate) fn push(&mut self, command: MixCommand) -> Result<(), MixError> {
        if self.is_full() {
            return Err(MixError::ChainFull(MAX_MIXES));
        }

        self.output_channels = command.resulting_channels(self.output_channels);
        self.mixing_channels = self.mixing_channels.max(self.output_channels);
        self.commands.push(command);
        Ok(())
    }

    /// Most recent fade aimed at exactly `target` (`All` only matches `All`).
    fn last_fade_mut(&mut self, target: ChannelTarget) -> Option<&mut FadeEnvelope> {
        self.commands.iter_mut().rev().find_map(|command| match command {
            MixCommand::Fade {
                target: fade_target,
                envelope,
            } if *fade_target == target => Some(envelope),
            _ => None,
        })
    }

    /// Resolve open boundaries between a new fade and the previous fade on
    /// the same target so consecutive fades hand over at one exact sample.
    ///
    /// May patch `post` of the previous fade; call only when `next` is going
    /// to be appended.
    pub(crate) fn stitch_fade(&mut self, target: ChannelTarget, next: &mut FadeEnvelope) {
        let Some(prev) = self.last_fade_mut(target) else {
            // nothing to hand over from: unity ends can be closed off
            if next.vol_start == 1.0 && next.pre.is_none() {
                next.pre = Some(next.start);
            }
            if next.vol_end == 1.0 && next.post.is_none() {
                next.post = Some(next.end);
            }
            return;
        };

        if prev.post.is_some() && next.pre.is_some() {
            return;
        }

        let overlaps = prev.end > next.start
            || matches!(prev.post, Some(post) if post > next.start)
            || matches!(next.pre, Some(pre) if pre < prev.end);
        if overlaps {
            debug!("fade on {} overlaps previous fade, left unstitched", target);
            return;
        }

        match (prev.post, next.pre) {
            (None, None) => {
                prev.post = Some(prev.end);
                next.pre = Some(prev.end);
            }
            (None, Some(pre)) => prev.post = Some(pre),
            (Some(post), None) => next.pre = Some(post),
            (Some(_), Some(_)) => {}
        }
    }
}

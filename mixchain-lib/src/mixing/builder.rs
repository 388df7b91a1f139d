//! Validating constructors for each mix command.
//!
//! Every constructor first checks the activation lock and chain capacity,
//! then its arguments against the chain width at this point of the chain,
//! then appends. A rejected call changes nothing and is
//! logged, so a bad configuration only means the effect does not happen.

use log::{debug, warn};

use crate::dsp::fade::FadeEnvelope;

use super::command::{ChannelTarget, MixCommand};
use super::error::MixError;
use super::state::MixingState;
use super::MAX_CHANNELS;

pub(super) fn log_rejection(err: MixError) -> MixError {
    match &err {
        MixError::Activated | MixError::ChainFull(_) => warn!("mix rejected: {}", err),
        _ => debug!("mix rejected: {}", err),
    }
    err
}

impl MixingState {
    /// Exchange channels `dst` and `src`.
    pub fn push_swap(&mut self, dst: usize, src: usize) -> Result<(), MixError> {
        let command = self.swap_command(dst, src);
        self.commit(command)
    }

    /// Mix `src * volume` into `dst`. A negative volume inverts the source.
    pub fn push_add(&mut self, dst: usize, src: usize, volume: f32) -> Result<(), MixError> {
        let command = self.add_command(dst, src, volume);
        self.commit(command)
    }

    /// Scale `target` by `volume`.
    pub fn push_volume(&mut self, target: ChannelTarget, volume: f32) -> Result<(), MixError> {
        let command = self.volume_command(target, volume);
        self.commit(command)
    }

    /// Clamp `target` to `ceiling` times full scale.
    pub fn push_limit(&mut self, target: ChannelTarget, ceiling: f32) -> Result<(), MixError> {
        let command = self.limit_command(target, ceiling);
        self.commit(command)
    }

    /// Insert a silent channel at `dst`; `dst` may equal the current width
    /// to append at the end.
    pub fn push_upmix(&mut self, dst: usize) -> Result<(), MixError> {
        let channels = self.chain.output_channels();
        let command = if dst > channels {
            Err(MixError::InvalidChannel {
                channel: dst,
                channels,
            })
        } else if channels + 1 > MAX_CHANNELS {
            Err(MixError::ChannelLimit(MAX_CHANNELS))
        } else {
            Ok(MixCommand::Upmix { dst })
        };
        self.commit(command)
    }

    /// Remove channel `dst`.
    pub fn push_downmix(&mut self, dst: usize) -> Result<(), MixError> {
        let command = self
            .check_channel(dst)
            .and_then(|()| match self.chain.output_channels() {
                channels if channels <= 1 => Err(MixError::LastChannel),
                _ => Ok(MixCommand::Downmix { dst }),
            });
        self.commit(command)
    }

    /// Drop every channel from `dst` on. Channel 0 always survives.
    pub fn push_killmix(&mut self, dst: usize) -> Result<(), MixError> {
        let command = if dst == 0 {
            Err(MixError::LastChannel)
        } else {
            self.check_channel(dst)
                .map(|()| MixCommand::Killmix { dst })
        };
        self.commit(command)
    }

    /// Apply `envelope` to `target`, stitching open boundaries against the
    /// previous fade on the same target.
    pub fn push_fade(
        &mut self,
        target: ChannelTarget,
        mut envelope: FadeEnvelope,
    ) -> Result<(), MixError> {
        let checked = self
            .ensure_appendable()
            .and_then(|()| self.check_target(target))
            .and_then(|()| {
                if envelope.is_well_formed() {
                    Ok(())
                } else {
                    Err(MixError::InvalidFadeTiming)
                }
            });
        if let Err(err) = checked {
            return Err(log_rejection(err));
        }

        self.chain.stitch_fade(target, &mut envelope);
        self.commit(Ok(MixCommand::Fade { target, envelope }))
    }

    fn commit(&mut self, command: Result<MixCommand, MixError>) -> Result<(), MixError> {
        self.ensure_appendable()
            .and(command)
            .and_then(|command| self.append(command))
            .map_err(log_rejection)
    }

    fn check_channel(&self, channel: usize) -> Result<(), MixError> {
        let channels = self.chain.output_channels();
        if channel >= channels {
            return Err(MixError::InvalidChannel { channel, channels });
        }
        Ok(())
    }

    fn check_target(&self, target: ChannelTarget) -> Result<(), MixError> {
        match target {
            ChannelTarget::All => Ok(()),
            ChannelTarget::Channel(channel) => self.check_channel(channel),
        }
    }

    fn swap_command(&self, dst: usize, src: usize) -> Result<MixCommand, MixError> {
        if dst == src {
            return Err(MixError::SameChannel(dst));
        }
        self.check_channel(dst)?;
        self.check_channel(src)?;
        Ok(MixCommand::Swap { dst, src })
    }

    fn add_command(&self, dst: usize, src: usize, volume: f32) -> Result<MixCommand, MixError> {
        if volume == 0.0 {
            return Err(MixError::NoOpVolume(volume));
        }
        if !volume.is_finite() {
            return Err(MixError::InvalidVolume(volume));
        }
        self.check_channel(dst)?;
        self.check_channel(src)?;
        Ok(MixCommand::Add { dst, src, volume })
    }

    fn volume_command(&self, target: ChannelTarget, volume: f32) -> Result<MixCommand, MixError> {
        if volume == 1.0 {
            return Err(MixError::NoOpVolume(volume));
        }
        if !volume.is_finite() {
            return Err(MixError::InvalidVolume(volume));
        }
        self.check_target(target)?;
        Ok(MixCommand::Volume { target, volume })
    }

    fn limit_command(&self, target: ChannelTarget, ceiling: f32) -> Result<MixCommand, MixError> {
        if ceiling < 0.0 || !ceiling.is_finite() {
            return Err(MixError::InvalidVolume(ceiling));
        }
        if ceiling == 1.0 {
            return Err(MixError::NoOpVolume(ceiling));
        }
        self.check_target(target)?;
        Ok(MixCommand::Limit { target, ceiling })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::fade::FadeShape;
    use crate::mixing::chain::MAX_MIXES;

    fn fade(vol_start: f32, vol_end: f32, start: i64, end: i64) -> FadeEnvelope {
        FadeEnvelope {
            vol_start,
            vol_end,
            shape: FadeShape::Triangular,
            pre: None,
            start,
            end,
            post: None,
        }
    }

    #[test]
    fn swap_validation() {
        let mut state = MixingState::new(2);
        assert_eq!(state.push_swap(1, 1), Err(MixError::SameChannel(1)));
        assert_eq!(
            state.push_swap(0, 2),
            Err(MixError::InvalidChannel {
                channel: 2,
                channels: 2
            })
        );
        assert!(state.push_swap(0, 1).is_ok());
        assert_eq!(state.commands().len(), 1);
    }

    #[test]
    fn add_rejects_silent_volume() {
        let mut state = MixingState::new(2);
        assert_eq!(state.push_add(0, 1, 0.0), Err(MixError::NoOpVolume(0.0)));
        assert!(state.push_add(0, 1, -1.0).is_ok());
        assert!(state.push_add(0, 3, 0.5).is_err());
    }

    #[test]
    fn volume_and_limit_reject_unity() {
        let mut state = MixingState::new(2);
        assert!(state.push_volume(ChannelTarget::All, 1.0).is_err());
        assert!(state.push_limit(ChannelTarget::All, 1.0).is_err());
        assert!(state.push_limit(ChannelTarget::All, -0.5).is_err());
        assert!(state.push_volume(ChannelTarget::Channel(2), 0.5).is_err());
        assert!(state.push_volume(ChannelTarget::Channel(1), 0.0).is_ok());
        assert!(state.push_limit(ChannelTarget::Channel(0), 0.5).is_ok());
        assert_eq!(state.commands().len(), 2);
    }

    #[test]
    fn upmix_allows_append_position() {
        let mut state = MixingState::new(2);
        assert!(state.push_upmix(2).is_ok());
        assert_eq!(state.info(), (3, 3));
        assert!(state.push_upmix(5).is_err());
    }

    #[test]
    fn upmix_respects_channel_ceiling() {
        let mut state = MixingState::new(MAX_CHANNELS);
        assert_eq!(
            state.push_upmix(0),
            Err(MixError::ChannelLimit(MAX_CHANNELS))
        );
    }

    #[test]
    fn downmix_keeps_one_channel() {
        let mut state = MixingState::new(2);
        assert!(state.push_downmix(1).is_ok());
        assert_eq!(state.push_downmix(0), Err(MixError::LastChannel));
        assert_eq!(state.info(), (2, 1));
    }

    #[test]
    fn killmix_sets_output_width() {
        for k in 1..6 {
            let mut state = MixingState::new(6);
            state.push_upmix(0).unwrap();
            state.push_downmix(3).unwrap();
            assert!(state.push_killmix(k).is_ok());
            assert_eq!(state.chain().output_channels(), k);
        }

        let mut state = MixingState::new(4);
        assert!(state.push_killmix(0).is_err());
        assert!(state.push_killmix(4).is_err());
    }

    #[test]
    fn indices_follow_running_width() {
        let mut state = MixingState::new(2);
        state.push_downmix(0).unwrap();
        assert!(state.push_swap(0, 1).is_err());
        state.push_upmix(1).unwrap();
        assert!(state.push_swap(0, 1).is_ok());
    }

    #[test]
    fn fade_rejects_bad_timing() {
        let mut state = MixingState::new(2);
        assert_eq!(
            state.push_fade(ChannelTarget::All, fade(1.0, 0.0, 200, 100)),
            Err(MixError::InvalidFadeTiming)
        );
        let mut envelope = fade(1.0, 0.0, 100, 200);
        envelope.post = Some(150);
        assert!(state.push_fade(ChannelTarget::All, envelope).is_err());
        assert!(state.commands().is_empty());
    }

    #[test]
    fn consecutive_fades_share_hand_over_point() {
        let mut state = MixingState::new(2);
        let target = ChannelTarget::Channel(0);
        state.push_fade(target, fade(0.0, 0.5, 0, 100)).unwrap();
        state.push_fade(target, fade(0.5, 0.0, 300, 400)).unwrap();

        let envelopes: Vec<FadeEnvelope> = state
            .commands()
            .iter()
            .filter_map(|command| match command {
                MixCommand::Fade { envelope, .. } => Some(*envelope),
                _ => None,
            })
            .collect();
        assert_eq!(envelopes[0].post, Some(100));
        assert_eq!(envelopes[1].pre, Some(100));
    }

    #[test]
    fn rejected_fade_does_not_patch_previous() {
        let mut state = MixingState::new(2);
        let target = ChannelTarget::Channel(0);
        state.push_fade(target, fade(0.0, 0.5, 0, 100)).unwrap();
        state.activate(16);
        assert_eq!(
            state.push_fade(target, fade(0.5, 0.0, 300, 400)),
            Err(MixError::Activated)
        );
        match state.commands()[0] {
            MixCommand::Fade { envelope, .. } => assert_eq!(envelope.post, None),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn chain_capacity_applies_to_every_constructor() {
        let mut state = MixingState::new(2);
        for _ in 0..MAX_MIXES {
            state.push_swap(0, 1).unwrap();
        }
        assert_eq!(state.push_upmix(0), Err(MixError::ChainFull(MAX_MIXES)));
        assert_eq!(
            state.push_fade(ChannelTarget::All, fade(1.0, 0.0, 0, 10)),
            Err(MixError::ChainFull(MAX_MIXES))
        );
        assert_eq!(state.info(), (2, 2));
    }

    #[test]
    fn lock_reported_before_argument_errors() {
        let mut state = MixingState::new(2);
        state.push_killmix(1).unwrap();
        state.activate(16);
        assert_eq!(state.push_swap(0, 1), Err(MixError::Activated));
        assert_eq!(state.push_add(0, 0, 0.0), Err(MixError::Activated));
        assert_eq!(state.push_downmix(0), Err(MixError::Activated));
        assert_eq!(state.push_killmix(0), Err(MixError::Activated));
        assert_eq!(state.push_upmix(9), Err(MixError::Activated));
        assert_eq!(
            state.push_fade(ChannelTarget::Channel(5), fade(1.0, 0.0, 10, 0)),
            Err(MixError::Activated)
        );
        assert_eq!(state.commands().len(), 1);
    }

    #[test]
    fn full_chain_reported_before_argument_errors() {
        let mut state = MixingState::new(2);
        for _ in 0..MAX_MIXES {
            state.push_swap(0, 1).unwrap();
        }
        assert_eq!(state.push_swap(0, 0), Err(MixError::ChainFull(MAX_MIXES)));
        assert_eq!(
            state.push_fade(ChannelTarget::Channel(7), fade(1.0, 0.0, 0, 10)),
            Err(MixError::ChainFull(MAX_MIXES))
        );
    }
}

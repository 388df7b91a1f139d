//! Per-block execution of a mix chain.
//!
//! Commands run one frame at a time: the frame is copied into a float row,
//! every command is applied to that row in chain order, and the row is
//! written back compacted to the width it ended with. The float buffer keeps
//! precision across chained volumes and saves repeated int/float casts.

use log::warn;

use crate::stream::StreamContext;

use super::command::{ChannelTarget, MixCommand};
use super::state::MixingState;

const LIMITER_MAX: f32 = 32767.0;
const LIMITER_MIN: f32 = -32768.0;

fn clamp16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn scale_lanes(row: &mut [f32], target: ChannelTarget, active: usize, gain: f32) {
    match target {
        ChannelTarget::All => row[..active].iter_mut().for_each(|lane| *lane *= gain),
        ChannelTarget::Channel(ch) => row[ch] *= gain,
    }
}

fn limit_lanes(row: &mut [f32], target: ChannelTarget, active: usize, ceiling: f32) {
    let max = LIMITER_MAX * ceiling;
    let min = LIMITER_MIN * ceiling;
    match target {
        ChannelTarget::All => row[..active]
            .iter_mut()
            .for_each(|lane| *lane = lane.clamp(min, max)),
        ChannelTarget::Channel(ch) => row[ch] = row[ch].clamp(min, max),
    }
}

impl MixingState {
    /// Whether any command can change samples in `[start, end)`.
    ///
    /// Fades are the only commands with a limited reach, so a chain of fades
    /// that are all out of range can be skipped entirely.
    fn is_active(&self, start: i64, end: i64) -> bool {
        self.chain.iter().any(|command| match command {
            MixCommand::Fade { envelope, .. } => {
                let (fade_start, fade_end) = envelope.active_window();
                start < fade_end && end > fade_start
            }
            _ => true,
        })
    }

    /// Mix `sample_count` interleaved frames of `buffer` in place.
    ///
    /// On entry `buffer` holds frames of the stream's decoded width; on
    /// return it holds frames of the chain's output width (see
    /// [`MixingState::info`]). Calls larger than the activated block size or
    /// the buffer are clamped to what fits.
    pub fn mix<S>(&mut self, buffer: &mut [i16], sample_count: usize, stream: &S)
    where
        S: StreamContext + ?Sized,
    {
        if !self.activated || self.chain.is_empty() {
            return;
        }

        let (input_channels, output_channels) = self.info();
        let fits_buffer = buffer.len() / input_channels.max(1);
        let sample_count = if sample_count > self.max_frames || sample_count > fits_buffer {
            let clamped = sample_count.min(self.max_frames).min(fits_buffer);
            warn!(
                "mix call of {} frame(s) clamped to {} (block {}, buffer {})",
                sample_count, clamped, self.max_frames, fits_buffer
            );
            clamped
        } else {
            sample_count
        };

        let current_pos = stream.playback_position();
        if !self.is_active(current_pos, current_pos + sample_count as i64) {
            return;
        }

        let stream_channels = self.stream_channels;
        let mixing_channels = self.chain.mixing_channels();
        let mut cursor = 0;

        for s in 0..sample_count {
            let row = &mut self.mixbuf[cursor..cursor + mixing_channels];
            let frame = &buffer[s * stream_channels..(s + 1) * stream_channels];
            for (lane, &sample) in row.iter_mut().zip(frame) {
                *lane = f32::from(sample);
            }

            let mut active = stream_channels;
            for command in self.chain.iter() {
                match *command {
                    MixCommand::Swap { dst, src } => row.swap(dst, src),
                    MixCommand::Add { dst, src, volume } => row[dst] += row[src] * volume,
                    MixCommand::Volume { target, volume } => {
                        scale_lanes(row, target, active, volume)
                    }
                    MixCommand::Limit { target, ceiling } => {
                        limit_lanes(row, target, active, ceiling)
                    }
                    MixCommand::Upmix { dst } => {
                        active += 1;
                        row.copy_within(dst..active - 1, dst + 1);
                        row[dst] = 0.0;
                    }
                    MixCommand::Downmix { dst } => {
                        active -= 1;
                        row.copy_within(dst + 1..=active, dst);
                    }
                    MixCommand::Killmix { dst } => active = dst,
                    MixCommand::Fade { target, envelope } => {
                        let pos = current_pos + s as i64;
                        if let Some(gain) = envelope.gain_at(pos) {
                            scale_lanes(row, target, active, gain);
                        }
                    }
                }
            }

            cursor += active;
        }

        // float to int truncates towards zero; +-1 is not audible
        let total = sample_count * output_channels;
        for (out, &mixed) in buffer[..total].iter_mut().zip(&self.mixbuf[..total]) {
            *out = clamp16(mixed as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::fade::{FadeEnvelope, FadeShape};
    use crate::stream::StreamState;

    fn stream(channels: usize) -> StreamState {
        StreamState::new(channels, 44_100, 1_000_000)
    }

    fn active_state(channels: usize, configure: impl FnOnce(&mut MixingState)) -> MixingState {
        let mut state = MixingState::new(channels);
        configure(&mut state);
        state.activate(1024);
        state
    }

    #[test]
    fn inactive_state_leaves_buffer_untouched() {
        let mut state = MixingState::new(2);
        state.push_swap(0, 1).unwrap();
        let mut buffer = vec![100_i16, 200, 300, 400];
        state.mix(&mut buffer, 2, &stream(2));
        assert_eq!(buffer, vec![100, 200, 300, 400]);
    }

    #[test]
    fn empty_chain_leaves_buffer_untouched() {
        let mut state = active_state(2, |_| {});
        let mut buffer = vec![i16::MAX, i16::MIN, 7, -7];
        state.mix(&mut buffer, 2, &stream(2));
        assert_eq!(buffer, vec![i16::MAX, i16::MIN, 7, -7]);
    }

    #[test]
    fn swap_exchanges_channels() {
        let mut state = active_state(2, |state| state.push_swap(0, 1).unwrap());
        let mut buffer = vec![100_i16, 200];
        state.mix(&mut buffer, 1, &stream(2));
        assert_eq!(buffer, vec![200, 100]);
    }

    #[test]
    fn swap_twice_restores_lanes() {
        let mut state = active_state(3, |state| {
            state.push_swap(0, 2).unwrap();
            state.push_swap(0, 2).unwrap();
        });
        let mut buffer = vec![1_i16, 2, 3, -4, -5, -6];
        state.mix(&mut buffer, 2, &stream(3));
        assert_eq!(buffer, vec![1, 2, 3, -4, -5, -6]);
    }

    #[test]
    fn volume_all_scales_every_lane() {
        let mut state = active_state(2, |state| {
            state.push_volume(ChannelTarget::All, 0.5).unwrap()
        });
        let mut buffer = vec![100_i16, -200];
        state.mix(&mut buffer, 1, &stream(2));
        assert_eq!(buffer, vec![50, -100]);
    }

    #[test]
    fn add_accumulates_and_clamps() {
        let mut state = active_state(2, |state| state.push_add(0, 1, 1.0).unwrap());
        let mut buffer = vec![30_000_i16, 30_000, -100, 50];
        state.mix(&mut buffer, 2, &stream(2));
        assert_eq!(buffer, vec![i16::MAX, 30_000, -50, 50]);
    }

    #[test]
    fn limit_clamps_to_ceiling() {
        let mut state = active_state(2, |state| {
            state.push_limit(ChannelTarget::Channel(1), 0.5).unwrap()
        });
        let mut buffer = vec![30_000_i16, 30_000, -30_000, -30_000];
        state.mix(&mut buffer, 2, &stream(2));
        assert_eq!(buffer, vec![30_000, 16_383, -30_000, -16_384]);
    }

    #[test]
    fn upmix_then_downmix_restores_frame() {
        let mut state = active_state(3, |state| {
            state.push_upmix(1).unwrap();
            state.push_downmix(1).unwrap();
        });
        let mut buffer = vec![10_i16, 20, 30, 40, 50, 60];
        state.mix(&mut buffer, 2, &stream(3));
        assert_eq!(buffer, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(state.info(), (3, 3));
    }

    #[test]
    fn upmix_widens_output() {
        let mut state = active_state(2, |state| state.push_upmix(1).unwrap());
        let (input_channels, output_channels) = state.info();
        assert_eq!((input_channels, output_channels), (3, 3));

        let mut buffer = vec![0_i16; 2 * input_channels];
        buffer[..4].copy_from_slice(&[1, 2, 3, 4]);
        state.mix(&mut buffer, 2, &stream(2));
        assert_eq!(buffer, vec![1, 0, 2, 3, 0, 4]);
    }

    #[test]
    fn downmix_and_killmix_compact_output() {
        let mut state = active_state(4, |state| {
            state.push_downmix(0).unwrap();
            state.push_killmix(2).unwrap();
        });
        let mut buffer = vec![1_i16, 2, 3, 4, 5, 6, 7, 8];
        state.mix(&mut buffer, 2, &stream(4));
        assert_eq!(&buffer[..4], &[2, 3, 6, 7]);
    }

    #[test]
    fn ordering_changes_meaning_of_indices() {
        // 2ch "1+2,1u": ch1 += ch2, then a silent lane is pushed in front
        let mut state = active_state(2, |state| {
            state.push_add(0, 1, 1.0).unwrap();
            state.push_upmix(0).unwrap();
        });
        let mut buffer = vec![10_i16, 20, 0];
        state.mix(&mut buffer, 1, &stream(2));
        assert_eq!(buffer, vec![0, 30, 20]);

        // 2ch "1u,1+2": the new silent lane receives old ch1
        let mut state = active_state(2, |state| {
            state.push_upmix(0).unwrap();
            state.push_add(0, 1, 1.0).unwrap();
        });
        let mut buffer = vec![10_i16, 20, 0];
        state.mix(&mut buffer, 1, &stream(2));
        assert_eq!(buffer, vec![10, 10, 20]);
    }

    #[test]
    fn fade_out_midpoint_halves_signal() {
        let mut state = active_state(2, |state| {
            state
                .push_fade(
                    ChannelTarget::All,
                    FadeEnvelope {
                        vol_start: 1.0,
                        vol_end: 0.0,
                        shape: FadeShape::Triangular,
                        pre: None,
                        start: 0,
                        end: 100,
                        post: None,
                    },
                )
                .unwrap()
        });
        let mut stream = stream(2);
        stream.current_sample = 50;
        let mut buffer = vec![1000_i16, -1000];
        state.mix(&mut buffer, 1, &stream);
        assert_eq!(buffer, vec![500, -500]);

        stream.current_sample = 200;
        let mut buffer = vec![1000_i16, -1000];
        state.mix(&mut buffer, 1, &stream);
        assert_eq!(buffer, vec![0, 0]);
    }

    #[test]
    fn distant_fade_skips_block() {
        let mut state = active_state(1, |state| {
            state
                .push_fade(
                    ChannelTarget::All,
                    FadeEnvelope {
                        vol_start: 1.0,
                        vol_end: 0.0,
                        shape: FadeShape::Triangular,
                        pre: None,
                        start: 10_000,
                        end: 20_000,
                        post: None,
                    },
                )
                .unwrap()
        });
        // the unity start closes pre at 10_000, so earlier blocks are inactive
        assert!(!state.is_active(0, 1024));
        assert!(state.is_active(9_500, 10_524));
        assert!(state.is_active(30_000, 31_000));

        let mut buffer = vec![1234_i16; 4];
        state.mix(&mut buffer, 4, &stream(1));
        assert_eq!(buffer, vec![1234; 4]);
    }

    #[test]
    fn oversized_call_is_clamped() {
        let mut state = MixingState::new(1);
        state.push_volume(ChannelTarget::All, 2.0).unwrap();
        state.activate(2);
        let mut buffer = vec![10_i16, 10, 10, 10];
        state.mix(&mut buffer, 4, &stream(1));
        assert_eq!(buffer, vec![20, 20, 10, 10]);
    }
}

//! Stream-side information the mixer reads while configuring and mixing.

/// Playback details exposed by the stream that owns a mixing state.
///
/// The mixer only reads these, except for the configured loop count, which
/// loop-driven macros raise so every layer or track gets heard.
pub trait StreamContext {
    /// Decoded channel count.
    fn channels(&self) -> usize;
    fn sample_rate(&self) -> u32;
    /// Next sample the decoder will produce, within the source.
    fn current_sample(&self) -> i64;
    fn loop_flag(&self) -> bool;
    fn loop_start_sample(&self) -> i64;
    fn loop_end_sample(&self) -> i64;
    /// Number of completed loops.
    fn loop_count(&self) -> u32;
    /// How many times the host intends to play the loop section.
    fn config_loop_count(&self) -> u32;
    fn set_config_loop_count(&mut self, count: u32);

    fn loop_length(&self) -> i64 {
        self.loop_end_sample() - self.loop_start_sample()
    }

    /// Absolute position in the played output, counting completed loops.
    fn playback_position(&self) -> i64 {
        let current = self.current_sample();
        let loop_start = self.loop_start_sample();
        if self.loop_flag() && current >= loop_start {
            let loop_into = current - loop_start;
            loop_start + loop_into + self.loop_length() * i64::from(self.loop_count())
        } else {
            current
        }
    }
}

/// Plain stream bookkeeping for hosts that drive decoding themselves.
///
/// `advance` walks the loop section `config_loop_count` times, then plays on
/// to `total_samples`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamState {
    pub channels: usize,
    pub sample_rate: u32,
    pub total_samples: i64,
    pub current_sample: i64,
    pub loop_flag: bool,
    pub loop_start_sample: i64,
    pub loop_end_sample: i64,
    pub loop_count: u32,
    pub config_loop_count: u32,
}

impl StreamState {
    /// Non-looping stream positioned at its first sample.
    pub fn new(channels: usize, sample_rate: u32, total_samples: i64) -> Self {
        Self {
            channels,
            sample_rate,
            total_samples,
            current_sample: 0,
            loop_flag: false,
            loop_start_sample: 0,
            loop_end_sample: total_samples,
            loop_count: 0,
            config_loop_count: 1,
        }
    }

    /// Enable looping between `start` and `end`.
    ///
    /// Invalid ranges leave the stream non-looping.
    pub fn with_loop(mut self, start: i64, end: i64) -> Self {
        if start >= 0 && start < end && end <= self.total_samples {
            self.loop_flag = true;
            self.loop_start_sample = start;
            self.loop_end_sample = end;
        } else {
            log::warn!(
                "ignoring loop {}..{} for a stream of {} sample(s)",
                start,
                end,
                self.total_samples
            );
        }
        self
    }

    fn loops_remaining(&self) -> bool {
        self.loop_flag && self.loop_count + 1 < self.config_loop_count.max(1)
    }

    /// Frames until the next loop jump or the end of playback.
    pub fn frames_until_boundary(&self) -> usize {
        let boundary = if self.loops_remaining() && self.current_sample < self.loop_end_sample {
            self.loop_end_sample
        } else {
            self.total_samples
        };
        (boundary - self.current_sample).max(0) as usize
    }

    /// Move forward by `frames`, jumping back to the loop start when the loop
    /// end is reached and more loops are due.
    pub fn advance(&mut self, frames: usize) {
        let mut remaining = frames as i64;
        while remaining > 0 && !self.is_finished() {
            let step = (self.frames_until_boundary() as i64).min(remaining);
            self.current_sample += step;
            remaining -= step;
            if self.loops_remaining() && self.current_sample >= self.loop_end_sample {
                self.current_sample = self.loop_start_sample;
                self.loop_count += 1;
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current_sample >= self.total_samples && !self.loops_remaining()
    }

    /// Total frames produced for the configured loop count.
    pub fn play_length(&self) -> i64 {
        if !self.loop_flag {
            return self.total_samples;
        }
        let loops = i64::from(self.config_loop_count.max(1));
        let tail = self.total_samples - self.loop_end_sample;
        self.loop_start_sample + self.loop_length() * loops + tail
    }
}

impl StreamContext for StreamState {
    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_sample(&self) -> i64 {
        self.current_sample
    }

    fn loop_flag(&self) -> bool {
        self.loop_flag
    }

    fn loop_start_sample(&self) -> i64 {
        self.loop_start_sample
    }

    fn loop_end_sample(&self) -> i64 {
        self.loop_end_sample
    }

    fn loop_count(&self) -> u32 {
        self.loop_count
    }

    fn config_loop_count(&self) -> u32 {
        self.config_loop_count
    }

    fn set_config_loop_count(&mut self, count: u32) {
        self.config_loop_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_without_loop_is_current_sample() {
        let mut stream = StreamState::new(2, 44_100, 1000);
        stream.advance(250);
        assert_eq!(stream.playback_position(), 250);
        assert_eq!(stream.play_length(), 1000);
    }

    #[test]
    fn position_counts_completed_loops() {
        let mut stream = StreamState::new(2, 44_100, 1000).with_loop(100, 600);
        stream.config_loop_count = 3;
        stream.current_sample = 350;
        stream.loop_count = 2;
        assert_eq!(stream.playback_position(), 350 + 500 * 2);
    }

    #[test]
    fn advance_wraps_until_configured_loops() {
        let mut stream = StreamState::new(1, 8_000, 1000).with_loop(100, 600);
        stream.config_loop_count = 2;
        assert_eq!(stream.play_length(), 100 + 500 * 2 + 400);

        let mut produced = 0;
        let mut last_position = -1;
        while !stream.is_finished() {
            let frames = stream.frames_until_boundary().min(64);
            assert!(frames > 0);
            let position = stream.playback_position();
            assert_eq!(position, produced as i64);
            assert!(position > last_position);
            last_position = position;
            stream.advance(frames);
            produced += frames;
        }
        assert_eq!(produced as i64, stream.play_length());
        assert_eq!(stream.loop_count, 1);
    }

    #[test]
    fn advance_past_boundary_carries_over() {
        let mut stream = StreamState::new(1, 8_000, 1000).with_loop(100, 600);
        stream.config_loop_count = 3;
        stream.advance(650);
        assert_eq!(stream.loop_count, 1);
        assert_eq!(stream.current_sample, 150);
        assert_eq!(stream.playback_position(), 650);
    }

    #[test]
    fn invalid_loop_is_ignored() {
        let stream = StreamState::new(1, 8_000, 1000).with_loop(600, 100);
        assert!(!stream.loop_flag);
    }
}

//! Synthetic benchmark for the mixing engine.

use rand::Rng;

use crate::dsp::fade::{FadeEnvelope, FadeShape};
use crate::mixing::{ChannelTarget, LayerMode, MixingState};
use crate::stream::{StreamContext, StreamState};

/// Configuration parameters for a mixing benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct MixBenchConfig {
    pub sample_rate: u32,
    pub channels: usize,
    pub input_seconds: f32,
    pub block_frames: usize,
    pub iterations: usize,
}

/// Timing results from a benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct MixBenchResult {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub audio_time_ms: f64,
    pub rt_factor: f64,
    pub mixes: usize,
}

/// Chain mixing a bit of everything: swaps, gains, a fade across the middle
/// of the input and a layer downmix to stereo when there are enough lanes.
fn build_state(config: &MixBenchConfig, total_frames: i64) -> MixingState {
    let mut state = MixingState::new(config.channels);
    if config.channels > 1 {
        let _ = state.push_swap(0, 1);
        let _ = state.push_add(0, 1, 0.5);
    }
    let _ = state.push_volume(ChannelTarget::All, 0.8);
    let _ = state.push_fade(
        ChannelTarget::All,
        FadeEnvelope {
            vol_start: 1.0,
            vol_end: 0.2,
            shape: FadeShape::RaisedCosine,
            pre: None,
            start: total_frames / 4,
            end: total_frames / 2,
            post: None,
        },
    );
    if config.channels > 2 {
        let _ = state.macro_layer(2, 0, LayerMode::Equal);
    }
    let _ = state.push_limit(ChannelTarget::All, 0.95);
    state.activate(config.block_frames.max(1));
    state
}

/// Mix random PCM through a representative chain.
pub fn bench_mixer(config: MixBenchConfig) -> MixBenchResult {
    let channels = config.channels.max(1);
    let config = MixBenchConfig {
        channels,
        block_frames: config.block_frames.max(1),
        ..config
    };
    let total_frames = (config.sample_rate as f32 * config.input_seconds).max(1.0) as usize;

    let mut rng = rand::thread_rng();
    let input: Vec<i16> = (0..total_frames * channels)
        .map(|_| rng.gen_range(i16::MIN..=i16::MAX))
        .collect();

    let mut state = build_state(&config, total_frames as i64);
    let (input_channels, _) = state.info();
    let mut block = vec![0_i16; config.block_frames * input_channels];
    let mut times: Vec<f64> = Vec::with_capacity(config.iterations.max(1));

    for _ in 0..config.iterations.max(1) {
        let mut stream = StreamState::new(channels, config.sample_rate, total_frames as i64);
        let start = std::time::Instant::now();
        while !stream.is_finished() {
            let frames = stream.frames_until_boundary().min(config.block_frames);
            let offset = stream.current_sample() as usize * channels;
            block[..frames * channels].copy_from_slice(&input[offset..offset + frames * channels]);
            state.mix(&mut block, frames, &stream);
            stream.advance(frames);
        }
        times.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    let min_ms = times
        .iter()
        .copied()
        .fold(f64::INFINITY, |a, b| a.min(b));
    let max_ms = times.iter().copied().fold(0.0_f64, |a, b| a.max(b));
    let avg_ms = times.iter().sum::<f64>() / times.len() as f64;
    let audio_time_ms = (total_frames as f64 / config.sample_rate as f64) * 1000.0;
    let rt_factor = if audio_time_ms > 0.0 {
        avg_ms / audio_time_ms
    } else {
        0.0
    };

    MixBenchResult {
        avg_ms,
        min_ms: if min_ms.is_finite() { min_ms } else { 0.0 },
        max_ms,
        audio_time_ms,
        rt_factor,
        mixes: state.commands().len(),
    }
}

/// Run the benchmark for several block sizes sharing a base configuration.
pub fn bench_mixer_sweep(
    base: MixBenchConfig,
    block_sizes: &[usize],
) -> Vec<(usize, MixBenchResult)> {
    block_sizes
        .iter()
        .map(|&block_frames| {
            let config = MixBenchConfig {
                block_frames,
                ..base
            };
            (block_frames, bench_mixer(config))
        })
        .collect()
}

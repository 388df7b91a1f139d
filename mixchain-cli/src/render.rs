//! `render`: run a mix document over a WAV file.

use clap::ArgMatches;
use log::{info, warn};
use mixchain_lib::mixing::MixingState;
use mixchain_lib::settings::MixSettingsFile;
use mixchain_lib::stream::{StreamContext, StreamState};

use crate::cli::args::DEFAULT_BLOCK_FRAMES;
use crate::error::RenderError;

/// Apply `--loop-start/--loop-end/--loop-count` to a fresh stream.
pub fn apply_loop_args(args: &ArgMatches, stream: StreamState) -> StreamState {
    let mut stream = match (
        args.get_one::<i64>("loop-start"),
        args.get_one::<i64>("loop-end"),
    ) {
        (start, Some(&end)) => stream.with_loop(start.copied().unwrap_or(0), end),
        _ => stream,
    };
    if let Some(&count) = args.get_one::<u32>("loop-count") {
        stream.set_config_loop_count(count.max(1));
    }
    stream
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String, RenderError> {
    args.get_one::<String>(name)
        .ok_or_else(|| RenderError::Unsupported(format!("missing {}", name)))
}

pub fn run(args: &ArgMatches) -> Result<i32, RenderError> {
    let input = required(args, "INPUT")?;
    let output = required(args, "OUTPUT")?;
    let settings = MixSettingsFile::from_path(required(args, "mix")?)?;
    let block = args
        .get_one::<usize>("block")
        .copied()
        .unwrap_or(DEFAULT_BLOCK_FRAMES)
        .max(1);

    let mut reader = hound::WavReader::open(input)?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(RenderError::Unsupported(format!(
            "{}-bit {:?} samples (only 16-bit integer PCM is mixed)",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let channels = usize::from(spec.channels);
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<i16>, hound::Error>>()?;
    let total_frames = samples.len() / channels.max(1);

    let stream = StreamState::new(channels, spec.sample_rate, total_frames as i64);
    let mut stream = apply_loop_args(args, stream);

    let mut state = MixingState::new(stream.channels());
    settings.apply(&mut state, &mut stream);
    state.activate(block);
    if !state.is_activated() {
        return Err(RenderError::Unsupported(format!(
            "could not allocate a mix buffer for {} frame(s)",
            block
        )));
    }

    let (input_channels, output_channels) = state.info();
    let frame_width = state.stream_channels();
    let out_spec = hound::WavSpec {
        channels: u16::try_from(output_channels).map_err(|_| {
            RenderError::Unsupported(format!("{} output channels", output_channels))
        })?,
        ..spec
    };
    let mut writer = hound::WavWriter::create(output, out_spec)?;

    info!(
        "rendering {} frame(s) ({} with {} loop(s)): {} -> {} channel(s)",
        total_frames,
        stream.play_length(),
        stream.config_loop_count(),
        channels,
        output_channels
    );

    let mut buffer = vec![0_i16; block * input_channels];
    let mut written = 0_usize;
    while !stream.is_finished() {
        let frames = stream.frames_until_boundary().min(block);
        if frames == 0 {
            warn!("stream stalled at sample {}", stream.current_sample());
            break;
        }

        let offset = stream.current_sample() as usize * channels;
        let source = &samples[offset..offset + frames * channels];
        if frame_width == channels {
            buffer[..frames * channels].copy_from_slice(source);
        } else {
            // virtual channel: the file has no such lane, feed silence
            for (frame, src) in buffer[..frames * frame_width]
                .chunks_exact_mut(frame_width)
                .zip(source.chunks_exact(channels))
            {
                frame[..channels].copy_from_slice(src);
                frame[channels..].fill(0);
            }
        }
        state.mix(&mut buffer, frames, &stream);

        for &sample in &buffer[..frames * output_channels] {
            writer.write_sample(sample)?;
        }
        written += frames;
        stream.advance(frames);
    }

    writer.finalize()?;
    state.close();
    info!("wrote {} frame(s) to {}", written, output);

    Ok(0)
}

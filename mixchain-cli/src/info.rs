//! `info`: expand a mix document for a given layout and print the result.

use clap::ArgMatches;
use mixchain_lib::mixing::MixingState;
use mixchain_lib::settings::MixSettingsFile;
use mixchain_lib::stream::{StreamContext, StreamState};
use serde::Serialize;

use crate::error::RenderError;
use crate::render::apply_loop_args;

/// What a document turns into once applied.
#[derive(Debug, Serialize)]
struct ChainSummary {
    input_channels: usize,
    output_channels: usize,
    mixing_channels: usize,
    loop_count: u32,
    play_length: i64,
    applied: usize,
    rejected: usize,
    mixes: Vec<String>,
}

pub fn run(args: &ArgMatches) -> Result<i32, RenderError> {
    let path = args
        .get_one::<String>("mix")
        .ok_or_else(|| RenderError::Unsupported("missing mix".to_string()))?;
    let settings = MixSettingsFile::from_path(path)?;
    let channels = args.get_one::<usize>("channels").copied().unwrap_or(2);
    if channels == 0 {
        return Err(RenderError::Unsupported("0 channels".to_string()));
    }
    let sample_rate = args.get_one::<u32>("sample-rate").copied().unwrap_or(44_100);

    // no audio: the stream is as long as the loop section needs
    let total = args.get_one::<i64>("loop-end").copied().unwrap_or(0);
    let stream = StreamState::new(channels, sample_rate, total);
    let mut stream = apply_loop_args(args, stream);

    let mut state = MixingState::new(stream.channels());
    let report = settings.apply(&mut state, &mut stream);
    let (input_channels, output_channels) = state.info();

    let summary = ChainSummary {
        input_channels,
        output_channels,
        mixing_channels: state.chain().mixing_channels(),
        loop_count: stream.config_loop_count(),
        play_length: stream.play_length(),
        applied: report.applied,
        rejected: report.rejected,
        mixes: state.commands().iter().map(|mix| mix.to_string()).collect(),
    };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(0);
    }

    println!("input channels: {}", summary.input_channels);
    println!("output channels: {}", summary.output_channels);
    println!("mixing channels: {}", summary.mixing_channels);
    println!("loop count: {}", summary.loop_count);
    println!("play length: {} frame(s)", summary.play_length);
    println!("entries: {}", report);
    println!("mixes ({}):", summary.mixes.len());
    for mix in &summary.mixes {
        println!("  {}", mix);
    }

    Ok(0)
}

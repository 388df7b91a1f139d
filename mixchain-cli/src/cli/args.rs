//! CLI argument definitions for `mixchain-cli`.

use clap::{value_parser, Arg, ArgAction, Command};

/// Frames mixed per call unless `--block` says otherwise.
pub const DEFAULT_BLOCK_FRAMES: usize = 4096;

fn mix_arg() -> Arg {
    Arg::new("mix")
        .long("mix")
        .short('m')
        .value_name("PATH")
        .required(true)
        .help("Path to a JSON mix document")
}

fn loop_args() -> [Arg; 3] {
    [
        Arg::new("loop-start")
            .long("loop-start")
            .value_name("SAMPLE")
            .value_parser(value_parser!(i64))
            .requires("loop-end")
            .help("First sample of the loop section"),
        Arg::new("loop-end")
            .long("loop-end")
            .value_name("SAMPLE")
            .value_parser(value_parser!(i64))
            .help("Sample after the last one of the loop section"),
        Arg::new("loop-count")
            .long("loop-count")
            .value_name("COUNT")
            .value_parser(value_parser!(u32))
            .default_value("1")
            .help("Times the loop section is played (macros may raise it)"),
    ]
}

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    Command::new("mixchain")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Apply channel mix chains to PCM audio")
        .arg_required_else_help(true)
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only log errors"),
        )
        .arg(
            Arg::new("bench")
                .long("bench")
                .action(ArgAction::SetTrue)
                .help("Run a synthetic mixing benchmark and exit"),
        )
        .arg(
            Arg::new("bench-sweep")
                .long("bench-sweep")
                .action(ArgAction::SetTrue)
                .help("Run the benchmark over several block sizes and exit"),
        )
        .arg(
            Arg::new("bench-channels")
                .long("bench-channels")
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .default_value("6")
                .help("Channel count for the mixing benchmark"),
        )
        .arg(
            Arg::new("bench-input-seconds")
                .long("bench-input-seconds")
                .value_name("SECONDS")
                .value_parser(value_parser!(f32))
                .default_value("10.0")
                .help("Input length in seconds for the mixing benchmark"),
        )
        .arg(
            Arg::new("bench-block")
                .long("bench-block")
                .value_name("FRAMES")
                .value_parser(value_parser!(usize))
                .default_value("4096")
                .help("Frames per mix call for the mixing benchmark"),
        )
        .arg(
            Arg::new("bench-iterations")
                .long("bench-iterations")
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .default_value("5")
                .help("Number of iterations for the mixing benchmark"),
        )
        .subcommand(
            Command::new("render")
                .about("Mix a 16-bit WAV file and write the result")
                .arg(
                    Arg::new("INPUT")
                        .help("The input WAV path")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("OUTPUT")
                        .help("The output WAV path")
                        .required(true)
                        .index(2),
                )
                .arg(mix_arg())
                .args(loop_args())
                .arg(
                    Arg::new("block")
                        .long("block")
                        .value_name("FRAMES")
                        .value_parser(value_parser!(usize))
                        .help("Frames per mix call (default 4096)"),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Print the expanded mix chain and channel counts")
                .arg(mix_arg())
                .arg(
                    Arg::new("channels")
                        .long("channels")
                        .short('c')
                        .value_name("COUNT")
                        .value_parser(value_parser!(usize))
                        .required(true)
                        .help("Channel count of the stream the mix is meant for"),
                )
                .arg(
                    Arg::new("sample-rate")
                        .long("sample-rate")
                        .value_name("HZ")
                        .value_parser(value_parser!(u32))
                        .default_value("44100")
                        .help("Sample rate used to place macro crossfades"),
                )
                .args(loop_args())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the summary as JSON"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Emit default JSON payloads")
                .subcommand(
                    Command::new("mix-json").about("Print a sample mix document"),
                ),
        )
}

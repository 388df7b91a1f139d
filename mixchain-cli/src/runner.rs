use clap::ArgMatches;
use log::{debug, error};
use mixchain_lib::settings::MixSettingsFile;

use crate::error::RenderError;
use crate::{cli, info, render};

fn print_mix_json() -> Result<i32, RenderError> {
    let json = serde_json::to_string_pretty(&MixSettingsFile::example())?;
    println!("{}", json);
    Ok(0)
}

pub fn run(args: &ArgMatches) -> Result<i32, RenderError> {
    debug!("starting mixchain");
    if let Some(code) = cli::bench::maybe_run_bench(args)? {
        return Ok(code);
    }

    match args.subcommand() {
        Some(("render", sub)) => render::run(sub),
        Some(("info", sub)) => info::run(sub),
        Some(("create", sub)) => match sub.subcommand() {
            Some(("mix-json", _)) => print_mix_json(),
            _ => {
                error!("create needs a payload kind (mix-json)");
                Ok(-1)
            }
        },
        _ => {
            error!("no command given");
            Ok(-1)
        }
    }
}

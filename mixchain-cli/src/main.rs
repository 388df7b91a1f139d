//! # Mixchain
//!
//! A command-line front end for the mixchain engine: render WAV files
//! through mix documents and inspect what a document expands to.

use log::error;

mod cli;
mod error;
mod info;
mod logging;
mod render;
mod runner;

fn main() {
    let args = cli::args::build_cli().get_matches();
    logging::init(args.get_flag("quiet"));

    let code = match runner::run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            -1
        }
    };

    std::process::exit(code)
}

//! bm - mirror a local directory into an S3-compatible bucket
//!
//! Establishes parity between the directory and the bucket at startup, then
//! watches the directory and applies every change to the bucket until
//! interrupted.

use clap::Parser;

mod args;
mod exit_code;
mod logging;
mod run;

use args::Cli;
use exit_code::ExitCode;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_file.as_deref()) {
        eprintln!("failed to set up logging: {e}");
        std::process::exit(ExitCode::GeneralError.as_i32());
    }

    let exit_code = run::run(cli).await;
    std::process::exit(exit_code.as_i32());
}

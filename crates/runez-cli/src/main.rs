// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! runez - Sampler of the runez convenience helpers

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_colors;
mod cmd_convert;
mod cmd_diagnostics;
mod cmd_passthrough;

use cmd_colors::CmdColors;
use cmd_convert::CmdConvert;
use cmd_diagnostics::CmdDiagnostics;
use cmd_passthrough::CmdPassthrough;

const APPNAME: &str = "runez";

#[derive(Parser)]
#[clap(
    name = "runez",
    about = "Sampler of the runez convenience helpers",
    version,
    long_about = "Exercise runez helpers from the command line: colors, diagnostics, running programs and conversions"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(flatten)]
    common: runez::cli::CommonFlags,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show available colors and styles
    Colors(CmdColors),

    /// Show system diagnostics
    Diagnostics(CmdDiagnostics),

    /// Run a program, showing its output while capturing it
    Passthrough(CmdPassthrough),

    /// Convert durations or sizes to their human friendly form
    Convert(CmdConvert),
}

impl Opt {
    async fn run(self) -> Result<i32> {
        let mut spec = self.common.log_spec(APPNAME);
        spec.console_level = Some(match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        });
        self.common.apply_with(APPNAME, spec)?;

        match self.cmd {
            Command::Colors(mut cmd) => cmd.run().await,
            Command::Diagnostics(mut cmd) => cmd.run().await,
            Command::Passthrough(mut cmd) => cmd.run().await,
            Command::Convert(mut cmd) => cmd.run().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run().await?;
    std::process::exit(code);
}

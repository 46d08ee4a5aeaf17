// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `runez passthrough` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use runez::{Policy, RunOptions};

/// Run a program, showing its output while capturing it
#[derive(Debug, Args)]
pub struct CmdPassthrough {
    /// Don't show output while the program runs, only report it afterwards
    #[clap(long)]
    capture_only: bool,

    /// Program to run, followed by its arguments
    #[clap(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

impl CmdPassthrough {
    pub async fn run(&mut self) -> Result<i32> {
        let Some((program, args)) = self.command.split_first() else {
            return Ok(0);
        };
        let options = RunOptions {
            passthrough: !self.capture_only,
            ..RunOptions::with_policy(Policy::lenient())
        };
        let result = runez::run(program, args, &options)?;

        println!();
        println!("{} {}", "Ran:".bold(), result.audit);
        let status = if result.succeeded() {
            "success".green()
        } else {
            format!("exit code {}", result.exit_code).red()
        };
        println!("{} {status}", "Status:".bold());
        report("stdout", &result.output);
        report("stderr", &result.error);

        Ok(result.exit_code)
    }
}

fn report(name: &str, captured: &str) {
    if captured.is_empty() {
        println!("{} {}", format!("Captured {name}:").bold(), "none".dimmed());
        return;
    }
    println!(
        "{} {}",
        format!("Captured {name}:").bold(),
        runez::plural(captured.lines().count(), "line"),
    );
    for line in captured.lines() {
        println!("  {}", line.dimmed());
    }
}

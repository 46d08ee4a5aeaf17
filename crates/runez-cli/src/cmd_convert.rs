// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `runez convert` command.

use clap::{Args, ValueEnum};
use colored::Colorize;
use miette::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    /// Durations like `1h5m` or `90`, or dates
    Duration,
    /// Sizes like `10k` or `1.5g`
    Size,
}

/// Convert durations or sizes to their human friendly form
#[derive(Debug, Args)]
pub struct CmdConvert {
    /// What the values are
    #[clap(value_enum)]
    kind: Kind,

    /// Values to convert
    #[clap(required = true)]
    values: Vec<String>,

    /// Number of parts shown for durations, 0 for all in short form
    #[clap(long, allow_negative_numbers = true)]
    span: Option<i32>,

    /// Unit shown for sizes
    #[clap(long, default_value = "B")]
    unit: String,
}

impl CmdConvert {
    pub async fn run(&mut self) -> Result<i32> {
        let mut code = 0;
        let width = self.values.iter().map(String::len).max().unwrap_or_default();
        for value in &self.values {
            let converted = match self.kind {
                Kind::Duration => runez::to_seconds(value)
                    .map(|seconds| runez::represented_duration(seconds, self.span, " ")),
                Kind::Size => runez::to_bytesize(value)
                    .map(|size| runez::represented_bytesize(size as f64, &self.unit)),
            };
            match converted {
                Some(converted) => println!("{value:>width$}: {}", converted.bold()),
                None => {
                    println!("{value:>width$}: {}", "invalid".red());
                    code = 1;
                }
            }
        }
        Ok(code)
    }
}

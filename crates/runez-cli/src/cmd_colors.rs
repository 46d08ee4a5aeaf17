// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `runez colors` command.

use clap::Args;
use colored::Colorize;
use miette::Result;
use runez::colors::{COLORS, Flavor, STYLES, colored, colored_bg};

/// Show available colors and styles
#[derive(Debug, Args)]
pub struct CmdColors {
    /// Also show colors on these backgrounds (comma separated)
    #[clap(long, value_name = "NAMES", value_delimiter = ',')]
    bg: Vec<String>,
}

impl CmdColors {
    pub async fn run(&mut self) -> Result<i32> {
        if let Some(unknown) = self
            .bg
            .iter()
            .find(|name| !COLORS.iter().any(|(n, _)| *n == name.as_str()))
        {
            return Err(miette::miette!(
                "Unknown color '{unknown}', available: {}",
                COLORS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
            ));
        }

        let coloring = if runez::is_coloring() {
            format!("on ({:?})", Flavor::detect()).green()
        } else {
            "off".dimmed()
        };
        println!("{} {coloring}", "Coloring:".bold());
        println!();

        println!("{}", "Colors:".bold());
        for (name, _) in COLORS {
            println!("  {}", colored(name, name));
        }
        println!();

        println!("{}", "Styles:".bold());
        for name in STYLES {
            println!("  {}", colored(name, name));
        }

        for bg in &self.bg {
            println!();
            println!("{}", format!("On {bg}:").bold());
            let line: Vec<String> = COLORS
                .iter()
                .map(|(name, _)| colored_bg(&colored(&format!(" {name} "), name), bg))
                .collect();
            println!("  {}", line.join(""));
        }

        Ok(0)
    }
}

// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `runez diagnostics` command.

use clap::Args;
use miette::{IntoDiagnostic, Result};
use runez::SYS_INFO;
use runez::render::PrettyTable;

/// Show system diagnostics
#[derive(Debug, Args)]
pub struct CmdDiagnostics {
    /// Output format: table, yaml, json
    #[clap(long, default_value = "table", value_parser = ["table", "yaml", "json"])]
    format: String,

    /// Border to use for table output (default: $DIAGNOSTICS_BORDER or colon)
    #[clap(long)]
    border: Option<String>,
}

impl CmdDiagnostics {
    pub async fn run(&mut self) -> Result<i32> {
        match self.format.as_str() {
            "json" => print!("{}", runez::represented_json(&*SYS_INFO, Some(2))?),
            "yaml" => print!("{}", serde_yaml::to_string(&*SYS_INFO).into_diagnostic()?),
            _ => self.show_table()?,
        }
        Ok(0)
    }

    fn show_table(&self) -> Result<()> {
        let mut rows = SYS_INFO.diagnostics();
        if let Some(location) = runez::LogManager::file_location() {
            rows.push(("log".to_string(), runez::short(location.display())));
        }
        let config = runez::config::global().to_string();
        if config != "empty" {
            rows.push(("config".to_string(), config));
        }
        let table = PrettyTable::two_column_diagnostics(
            &rows,
            self.border.as_deref(),
            runez::terminal_columns(),
        )?;
        println!("{table}");
        Ok(())
    }
}

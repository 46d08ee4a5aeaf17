// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! runez - Convenience helpers for command line tools
//!
//! This crate provides the glue most command line tools end up needing:
//! file operations, running programs, logging setup, date and size
//! conversions, configuration lookup, terminal colors and tables, a small
//! REST client and schema-checked serialization.
//!
//! # Overview
//!
//! Helpers that modify something (copy a file, run a program...) share the
//! same behavior, driven by a [`Policy`]:
//!
//! - in dry-run mode, they only log what they would do ("Would ...")
//! - what they do is reported on the policy's [`Chatter`] channel
//! - failures are an error, a logged warning or silently ignored, per [`Fatal`]
//!
//! # Example
//!
//! ```no_run
//! use runez::{Policy, TransferOptions};
//!
//! fn publish() -> runez::Result<()> {
//!     runez::ensure_folder("dist", true, &Policy::default())?;
//!     runez::copy("target/release/tool", "dist/tool", &TransferOptions::default())?;
//!     runez::compress("dist", "tool.tar.gz", None, &TransferOptions::default())?;
//!     Ok(())
//! }
//! ```

pub mod base;
pub mod cli;
pub mod colors;
pub mod config;
pub mod convert;
pub mod date;
pub mod error;
pub mod file;
pub mod heartbeat;
pub mod http;
pub mod logsetup;
pub mod policy;
pub mod program;
pub mod render;
pub mod schema;
pub mod serialize;
pub mod system;

pub use base::{
    Anchored, Flatten, SYMBOLIC_TMP, Split, capped, decode, first_line, flattened, is_dryrun,
    joined, quoted, resolved_dryrun, resolved_path, set_dryrun, shellified, short, short_to,
    shortened, uncolored,
};
pub use colors::{ActivateColors, activate_colors, colored, is_coloring};
pub use config::{CONFIG, Configuration};
pub use convert::{
    plural, pluralized, represented_bytesize, represented_with_units, to_boolean, to_bytesize,
    to_bytesize_in, to_float, to_int,
};
pub use date::{
    datetime_from_epoch, elapsed, local_timezone, represented_duration, timezone_from_text,
    to_date, to_datetime, to_epoch, to_epoch_ms, to_seconds,
};
pub use error::{Error, Result};
pub use file::{
    CurrentFolder, Hash, Overwrite, TempFolder, TransferOptions, basename, checksum, compress,
    copy, decompress, delete, ensure_folder, filesize, ini_to_dict, is_subfolder, is_younger,
    ls_dir, move_path, parent_folder, readlines, symlink, to_path, touch, write,
};
pub use http::{RestClient, RestResponse, urljoin};
pub use logsetup::{LogManager, LogSpec, Timeit, trace};
pub use policy::{
    Chatter, Fatal, Outcome, Policy, abort, abort_if, abort_with_code, hdry, hlog,
};
pub use program::{
    RunOptions, RunResult, check_pid, is_executable, make_executable, require_installed, run,
    shell, which,
};
pub use render::{PrettyBorder, PrettyTable};
pub use schema::{Schema, Serializable, StructSchema};
pub use serialize::{from_json, read_json, represented_json, save_json};
pub use system::{SYS_INFO, SystemInfo, is_stdout_tty, terminal_columns};

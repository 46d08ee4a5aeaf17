// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Failure and chatter policy shared by all mutating helpers.
//!
//! Helpers that touch the filesystem or spawn processes accept a [`Policy`]
//! stating whether a failure is an error ([`Fatal::Abort`]), merely logged
//! ([`Fatal::Log`]) or silently ignored ([`Fatal::Quiet`]), how to report
//! what they did ([`Chatter`]), and whether to honor the global dry-run flag.

use crate::{Error, Result};

#[cfg(test)]
#[path = "./policy_test.rs"]
mod policy_test;

/// What to do when an operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fatal {
    /// Log the failure and return [`Error::Aborted`].
    #[default]
    Abort,
    /// Log the failure and return a fallback value.
    Log,
    /// Return a fallback value without logging anything.
    Quiet,
}

/// Where to report what an operation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Chatter {
    /// Regular debug log events.
    #[default]
    Debug,
    /// Print to stdout.
    Print,
    /// The trace channel, see [`crate::logsetup::trace`].
    Trace,
    /// Don't report anything.
    Silent,
}

/// Per-call settings for mutating helpers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub fatal: Fatal,
    pub logger: Chatter,
    /// Override the global dry-run flag.
    pub dryrun: Option<bool>,
}

impl Policy {
    /// Abort on failure, with default chatter.
    pub fn fatal() -> Self {
        Self::default()
    }

    /// Log failures, but don't abort.
    pub fn lenient() -> Self {
        Self {
            fatal: Fatal::Log,
            ..Default::default()
        }
    }

    /// Neither abort nor log anything.
    pub fn quiet() -> Self {
        Self {
            fatal: Fatal::Quiet,
            logger: Chatter::Silent,
            dryrun: None,
        }
    }

    pub fn with_fatal(mut self, fatal: Fatal) -> Self {
        self.fatal = fatal;
        self
    }

    pub fn with_logger(mut self, logger: Chatter) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = Some(dryrun);
        self
    }

    /// Dry-run setting for this call.
    pub fn is_dryrun(&self) -> bool {
        crate::resolved_dryrun(self.dryrun)
    }
}

/// Result of a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing needed to be done.
    NoOp,
    /// The operation was performed (or would have been, in dry-run mode).
    Done,
    /// The operation failed, with a non-fatal policy.
    Failed,
}

impl Outcome {
    /// Conventional integer form: 1 done, 0 no-op, -1 failed.
    pub fn code(self) -> i32 {
        match self {
            Outcome::NoOp => 0,
            Outcome::Done => 1,
            Outcome::Failed => -1,
        }
    }

    pub fn is_failed(self) -> bool {
        self == Outcome::Failed
    }
}

/// Report a failure according to `policy`.
///
/// Returns [`Error::Aborted`] with `message` when the policy is fatal,
/// `fallback` otherwise.
pub fn abort<T>(message: impl Into<String>, policy: &Policy, fallback: T) -> Result<T> {
    abort_with_code(message, 1, policy, fallback)
}

/// Same as [`abort`], with an explicit exit code for the resulting error.
pub fn abort_with_code<T>(
    message: impl Into<String>,
    code: i32,
    policy: &Policy,
    fallback: T,
) -> Result<T> {
    let message = message.into();
    match policy.fatal {
        Fatal::Abort => {
            show_abort_message(&message, policy.logger);
            Err(Error::Aborted { message, code })
        }
        Fatal::Log => {
            show_abort_message(&message, policy.logger);
            Ok(fallback)
        }
        Fatal::Quiet => Ok(fallback),
    }
}

/// Return [`Error::Aborted`] when `condition` holds.
pub fn abort_if(condition: bool, message: impl Into<String>) -> Result<()> {
    if condition {
        return abort(message, &Policy::fatal(), ());
    }
    Ok(())
}

fn show_abort_message(message: &str, logger: Chatter) {
    match logger {
        Chatter::Silent => {}
        Chatter::Print => println!("{message}"),
        Chatter::Trace => crate::logsetup::trace(message),
        Chatter::Debug => tracing::error!("{message}"),
    }
}

/// Log "Would `message`" and return true when in dry-run mode.
///
/// Allows the usual early return of mutating helpers:
///
/// ```
/// # fn example(policy: &runez::Policy) {
/// if runez::hdry(policy, "delete foo") {
///     return;
/// }
/// # }
/// ```
pub fn hdry(policy: &Policy, message: impl AsRef<str>) -> bool {
    if !policy.is_dryrun() {
        return false;
    }
    let message = format!("Would {}", message.as_ref());
    match policy.logger {
        Chatter::Silent => {}
        Chatter::Trace => crate::logsetup::trace(&message),
        Chatter::Debug | Chatter::Print => println!("{message}"),
    }
    true
}

/// Report `message` on the given channel.
pub fn hlog(logger: Chatter, message: impl AsRef<str>) {
    let message = message.as_ref();
    match logger {
        Chatter::Silent => {}
        Chatter::Print => println!("{message}"),
        Chatter::Trace => crate::logsetup::trace(message),
        Chatter::Debug => tracing::debug!("{message}"),
    }
}

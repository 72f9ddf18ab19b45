//! CLI command handlers, one file per command.

mod formats;
mod get;

pub use formats::run_formats;
pub use get::run_get;

use dlq_core::args::{sanitize_args, split_shell};

/// Splits a `--args` string and drops flags the queue does not allow.
fn job_args(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let sanitized = sanitize_args(&split_shell(raw));
    if !sanitized.blocked.is_empty() {
        eprintln!("ignoring blocked flags: {}", sanitized.blocked.join(" "));
    }
    sanitized.args
}

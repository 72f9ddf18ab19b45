//! Argument hygiene for user-supplied tool flags.

use regex::Regex;
use std::sync::LazyLock;

/// Tool flags that can run commands or read/write arbitrary files.
const DANGEROUS_FLAGS: &[&str] = &[
    "--exec",
    "--exec-before-download",
    "--batch-file",
    "--config-location",
    "--config-locations",
    "--cookies",
    "--cookies-from-browser",
    "--download-archive",
    "--print-to-file",
    "--output-na-placeholder",
    "--postprocessor-args",
    "--ppa",
];

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]*)"|'([^']*)'|(\S+)"#).expect("token pattern is valid")
});

/// Splits a shell-like string into tokens, honoring single and double quotes.
/// Empty quoted strings are dropped.
pub fn split_shell(s: &str) -> Vec<String> {
    TOKEN
        .captures_iter(s.trim())
        .filter_map(|caps| {
            (1..=3)
                .filter_map(|i| caps.get(i))
                .map(|m| m.as_str())
                .find(|t| !t.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Result of [`sanitize_args`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedArgs {
    pub args: Vec<String>,
    /// Names of the flags that were removed, in order of appearance.
    pub blocked: Vec<String>,
}

/// Removes dangerous flags and their values (`--flag value` and `--flag=value`).
pub fn sanitize_args(args: &[String]) -> SanitizedArgs {
    let mut out = SanitizedArgs::default();
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        let (flag, inline_value) = match arg.find('=') {
            Some(i) if i > 0 => (&arg[..i], true),
            _ => (arg.as_str(), false),
        };
        if DANGEROUS_FLAGS.contains(&flag) {
            out.blocked.push(flag.to_string());
            if !inline_value && iter.peek().is_some_and(|next| !next.starts_with('-')) {
                iter.next();
            }
            continue;
        }
        out.args.push(arg.clone());
    }
    if !out.blocked.is_empty() {
        tracing::warn!(blocked = ?out.blocked, "dropped dangerous tool flags");
    }
    out
}

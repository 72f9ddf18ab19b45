use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_get_single_target() {
    match parse(&["dlq", "get", "https://example.com/watch?v=1"]) {
        CliCommand::Get {
            targets,
            args,
            jobs,
            json,
        } => {
            assert_eq!(targets, vec!["https://example.com/watch?v=1"]);
            assert!(args.is_none());
            assert!(jobs.is_none());
            assert!(!json);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_with_options() {
    match parse(&[
        "dlq",
        "get",
        "--jobs",
        "3",
        "--json",
        "--args",
        "-f 'bv*+ba' --embed-subs",
        "a",
        "b",
    ]) {
        CliCommand::Get {
            targets,
            args,
            jobs,
            json,
        } => {
            assert_eq!(targets, vec!["a", "b"]);
            assert_eq!(args.as_deref(), Some("-f 'bv*+ba' --embed-subs"));
            assert_eq!(jobs, Some(3));
            assert!(json);
        }
        _ => panic!("expected Get"),
    }
}

#[test]
fn cli_parse_get_requires_a_target() {
    assert!(Cli::try_parse_from(["dlq", "get"]).is_err());
}

#[test]
fn cli_parse_get_rejects_bad_jobs() {
    assert!(Cli::try_parse_from(["dlq", "get", "--jobs", "many", "a"]).is_err());
}

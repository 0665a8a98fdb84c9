// Argument parsing

use crate::cli::{Cli, Command};

use std::path::PathBuf;

use clap::{CommandFactory, Parser};

#[test]
fn given_cli_definition_when_checked_then_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn given_global_flags_when_parsed_then_populated() {
    // GIVEN / WHEN
    let cli = Cli::try_parse_from([
        "companion-cli",
        "--config",
        "companion.json",
        "--port",
        "4000",
        "--verbose",
        "ready",
    ])
    .unwrap();

    // THEN
    assert_eq!(cli.config, Some(PathBuf::from("companion.json")));
    assert_eq!(cli.port, Some(4000));
    assert!(cli.verbose);
    assert!(matches!(cli.command, Command::Ready));
}

#[test]
fn given_sign_args_when_parsed_then_kebab_case_flags_accepted() {
    let cli = Cli::try_parse_from([
        "companion-cli",
        "sign",
        "--to-sign",
        "0x68656c6c6f",
        "--pkp-public-key",
        "0x04ab",
    ])
    .unwrap();

    match cli.command {
        Command::Sign {
            to_sign,
            pkp_public_key,
        } => {
            assert_eq!(to_sign, "0x68656c6c6f");
            assert_eq!(pkp_public_key, "0x04ab");
        }
        other => panic!("Expected Sign, got {other:?}"),
    }
}

/// **VALUE**: Verifies that `exec` requires exactly one code source.
///
/// **BUG THIS CATCHES**: Would catch the argument group being dropped, which would let
/// `exec` start a companion only to fail on missing input.
#[test]
fn given_exec_without_or_with_both_sources_when_parsed_then_rejected() {
    let neither = Cli::try_parse_from(["companion-cli", "exec"]);
    let both = Cli::try_parse_from(["companion-cli", "exec", "--code", "1", "--file", "a.js"]);

    assert!(neither.is_err());
    assert!(both.is_err());
}

#[test]
fn given_exec_with_params_when_parsed_then_populated() {
    let cli = Cli::try_parse_from([
        "companion-cli",
        "exec",
        "--code",
        "go()",
        "--params",
        r#"{"a":1}"#,
    ])
    .unwrap();

    match cli.command {
        Command::Exec { code, file, params } => {
            assert_eq!(code.as_deref(), Some("go()"));
            assert!(file.is_none());
            assert_eq!(params.as_deref(), Some(r#"{"a":1}"#));
        }
        other => panic!("Expected Exec, got {other:?}"),
    }
}

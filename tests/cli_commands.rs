// tests/cli_commands.rs

mod common;
use crate::common::{TestResult, init_tracing};

use std::fs;

use clap::Parser;
use depengine::cli::{CliArgs, Command};
use depengine::run;
use tempfile::tempdir;

#[test]
fn stress_arguments_have_defaults() -> TestResult {
    let args = CliArgs::try_parse_from(["depengine", "stress", "--ops", "10"])?;
    let Command::Stress(stress) = args.command else {
        panic!("expected the stress subcommand");
    };
    assert_eq!(stress.ops, 10);
    assert_eq!(stress.vars, 16);
    assert_eq!(stress.fan_in, 3);
    assert!(stress.config.is_none());
    Ok(())
}

#[test]
fn log_level_is_accepted_after_the_subcommand() -> TestResult {
    let args = CliArgs::try_parse_from(["depengine", "check-config", "--log-level", "debug"])?;
    assert!(args.log_level.is_some());
    assert!(matches!(args.command, Command::CheckConfig { .. }));
    Ok(())
}

#[test]
fn check_config_rejects_invalid_files() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let good = dir.path().join("good.toml");
    let bad = dir.path().join("bad.toml");
    fs::write(&good, "[engine]\nkind = \"naive\"\n")?;
    fs::write(&bad, "[workers]\nruntime_threads = 0\n")?;

    let ok = CliArgs::try_parse_from([
        "depengine",
        "check-config",
        "--config",
        good.to_str().expect("utf-8 path"),
    ])?;
    run(ok)?;

    let failing = CliArgs::try_parse_from([
        "depengine",
        "check-config",
        "--config",
        bad.to_str().expect("utf-8 path"),
    ])?;
    assert!(run(failing).is_err());
    Ok(())
}

#[test]
fn stress_command_runs_clean_on_both_engines() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    for kind in ["naive", "threaded"] {
        let path = dir.path().join(format!("{kind}.toml"));
        fs::write(
            &path,
            format!("[engine]\nkind = \"{kind}\"\n[workers]\ncompute = 4\n"),
        )?;
        let args = CliArgs::try_parse_from([
            "depengine",
            "stress",
            "--config",
            path.to_str().expect("utf-8 path"),
            "--vars",
            "6",
            "--ops",
            "300",
            "--max-work-us",
            "20",
        ])?;
        run(args)?;
    }
    Ok(())
}

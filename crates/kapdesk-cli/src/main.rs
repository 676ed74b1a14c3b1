// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use kapdesk_app::{AppState, locale};
use runtime::{ApiRuntime, SessionStore};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `kapdesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let store = SessionStore::new(config.session_path()?);
    if options.logout {
        store.clear()?;
        println!("signed out; removed {}", store.path().display());
        return Ok(());
    }

    let client = kapdesk_api::Client::new(config.base_url(), config.timeout()?).with_context(
        || {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        },
    )?;
    locale::init(config.locale()).context("load locale tables")?;
    if options.check_only {
        return Ok(());
    }

    init_logging(&config)?;
    info!(base_url = client.base_url(), "starting console");

    let session = match store.load() {
        Ok(session) => session,
        Err(error) => {
            warn!(error = %format!("{error:#}"), "ignoring stored session");
            None
        }
    };

    let mut state = AppState::with_session(session, config.locale());
    let mut runtime = ApiRuntime::new(client, store).with_page_size(config.page_size());
    kapdesk_tui::run_app(&mut state, &mut runtime)
}

/// The terminal belongs to the UI, so logs go to a file. `RUST_LOG` wins
/// over `[log].filter`.
fn init_logging(config: &Config) -> Result<()> {
    let log_file = config.log_file()?;
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("open log file {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .context("build log filter")?;

    // Tests and embedders may have installed one already.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    logout: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        logout: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--logout" => {
                options.logout = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("kapdesk - KAP ticketing console");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config and API settings, then exit");
    println!("  --logout                 Forget the stored session");
    println!("  --help                   Show this help");
}

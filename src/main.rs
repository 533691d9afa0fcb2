use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use url::Url;

use scopecrawl_core::{ensure_workdir, CrawlError, EngineConfig, WorkLock};

use scopecrawl::cli::Cli;
use scopecrawl::control::ControlBlock;
use scopecrawl::crawl;

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {e}");
            return ExitCode::from(2);
        }
    };
    runtime.block_on(async_main())
}

async fn async_main() -> ExitCode {
    let cli = Cli::parse();
    let workdir = std::path::PathBuf::from(&cli.workdir);

    if cli.purge {
        if let Err(e) = purge_workdir(&workdir) {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    }
    if let Err(e) = ensure_workdir(&workdir) {
        eprintln!("failed to create workdir {}: {e}", workdir.display());
        return ExitCode::from(2);
    }

    let _log_guard = match init_logging(&workdir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::from(2);
        }
    };

    match run(cli, workdir).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli, workdir: std::path::PathBuf) -> Result<ExitCode> {
    let start_url = Url::parse(&cli.url).with_context(|| format!("invalid start url: {}", cli.url))?;
    let config = EngineConfig::new(
        start_url,
        workdir,
        cli.depth,
        cli.attempts,
        cli.no_ui,
        cli.inject_errors,
        cli.purge,
    );

    let lock = match WorkLock::acquire(config.lock_path())? {
        Ok(lock) => lock,
        Err(_already_running) => {
            error!(path = %config.lock_path().display(), "another crawl process is already running for this workdir");
            return Ok(ExitCode::from(1));
        }
    };

    let control = ControlBlock::new();
    control.watch_ctrl_c();

    info!(url = %config.start_url, workdir = %config.workdir.display(), depth = config.max_depth, attempts = config.max_attempts, "starting crawl");

    let result = crawl::run(config, control).await;
    drop(lock);

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(CrawlError::Environment(fault)) => {
            error!(error = %fault, "fix environment and restart");
            Ok(ExitCode::from(2))
        }
        Err(other) => {
            error!(error = %other, "unexpected fault escaped the crawl loop");
            Ok(ExitCode::from(2))
        }
    }
}

/// Removes the working directory's contents after confirmation. On a
/// non-interactive stdin (no TTY), the purge is auto-confirmed — a
/// confirmation dialog is a UI concern this core only approximates.
fn purge_workdir(workdir: &std::path::Path) -> Result<()> {
    if !workdir.exists() {
        return Ok(());
    }
    if std::io::stdin().is_terminal() {
        eprint!("purge {}? [y/N] ", workdir.display());
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            anyhow::bail!("purge aborted by operator");
        }
    }
    std::fs::remove_dir_all(workdir).with_context(|| format!("failed to purge {}", workdir.display()))
}

fn init_logging(workdir: &std::path::Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(workdir, "log.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

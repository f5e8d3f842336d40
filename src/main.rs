// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Config --> Logging --> Command Dispatch
//!   Change | Delete | Patch | CherryPick | Preview | Config
//!
//! Ctrl-C cancels the shared token; running git commands are killed and
//! the target branch is left untouched.
//! ```

use std::process::ExitCode;

use repofiles_rs::cli::global::GlobalOptions;
use repofiles_rs::cli::{self, Command};
use repofiles_rs::cmd::config::{run_config_command, run_config_files_command};
use repofiles_rs::cmd::files::{
    run_change_command, run_cherry_pick_command, run_delete_command, run_patch_command,
    run_preview_command,
};
use repofiles_rs::config::Config;
use repofiles_rs::config::loader::ConfigLoader;
use repofiles_rs::logging::{LogConfig, LogGuard, init_logging};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const DEFAULT_CONFIG_FILE: &str = "repofiles.toml";
const ENV_PREFIX: &str = "REPOFILES";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    if matches!(cli.command, Some(Command::Version)) {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    if matches!(cli.command, Some(Command::ConfigFiles)) {
        return match build_config_loader(&cli.global) {
            Ok(loader) => {
                run_config_files_command(&loader.format_loaded_files());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&cli.global) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match start_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    dispatch_command(&cli, &config, &token).await
}

fn start_logging(config: &Config) -> repofiles_rs::error::Result<LogGuard> {
    let log_config = LogConfig::builder()
        .with_console_level(config.log.console_level)
        .with_file_level(config.log.file_level)
        .maybe_with_log_file(config.log.file.clone())
        .with_json(config.log.json)
        .build();
    init_logging(&log_config)
}

async fn dispatch_command(cli: &cli::Cli, config: &Config, token: &CancellationToken) -> ExitCode {
    let result = match &cli.command {
        Some(Command::Change(args)) => run_change_command(args, config, token).await,
        Some(Command::Delete(args)) => run_delete_command(args, config, token).await,
        Some(Command::Patch(args)) => run_patch_command(args, config, token).await,
        Some(Command::CherryPick(args)) => run_cherry_pick_command(args, config, token).await,
        Some(Command::Preview(args)) => run_preview_command(args, config, token).await,
        Some(Command::Config) => {
            run_config_command(config);
            Ok(())
        }
        Some(Command::Version | Command::ConfigFiles) => Ok(()),
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            Err(anyhow::anyhow!("No command specified"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn build_config_loader(global: &GlobalOptions) -> repofiles_rs::error::Result<ConfigLoader> {
    let mut loader = ConfigLoader::new();
    if !global.no_default_config {
        loader = loader.add_toml_file_optional(DEFAULT_CONFIG_FILE);
    }
    for path in &global.configs {
        loader = loader.add_toml_file(path);
    }
    loader = loader.with_env_prefix(ENV_PREFIX);
    for assignment in global.to_config_overrides() {
        loader = loader.set_assignment(&assignment)?;
    }
    Ok(loader)
}

fn load_config(global: &GlobalOptions) -> repofiles_rs::error::Result<Config> {
    build_config_loader(global)?.build()
}

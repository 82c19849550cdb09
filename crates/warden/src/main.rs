// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Warden - a Telegram bot that collects whitelist applications and lets
//! admins approve or decline them.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

/// Warden - whitelist application bot.
///
/// Configuration comes from `warden.toml` (or `--config`) and the
/// `TELEGRAM_*`, `SERVER_*`, `LOGS_*` and `STORAGE_*` environment variables.
#[derive(Parser, Debug)]
#[command(name = "warden", version, about, long_about = None)]
struct Cli {
    /// Read the TOML layer from this file instead of `warden.toml`.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => warden_config::load_and_validate_at(path),
        None => warden_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            warden_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        eprintln!(
            "warden: configuration ok ({} admin(s), {:?} storage)",
            config.telegram.admin_ids.len(),
            config.storage.backend
        );
        return ExitCode::SUCCESS;
    }

    match serve::run_serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use serial_test::serial;

    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_accepts_config_path_and_check() {
        let cli = Cli::try_parse_from(["warden", "--config", "/etc/warden.toml", "--check"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/warden.toml")));
        assert!(cli.check);
    }

    #[test]
    fn cli_rejects_subcommands() {
        assert!(Cli::try_parse_from(["warden", "serve"]).is_err());
    }

    #[test]
    #[serial]
    fn binary_loads_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        std::fs::write(
            &path,
            "[telegram]\ntoken = \"123:ABC\"\nadmin_ids = [1]\n\n[storage]\nbackend = \"memory\"\n",
        )
        .unwrap();
        let config = warden_config::load_and_validate_at(&path).expect("config should be valid");
        assert_eq!(config.telegram.admin_ids, vec![1]);
        assert_eq!(config.server.max_requests_per_user, 3);
    }
}

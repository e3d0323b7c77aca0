use std::{io, path::PathBuf, process};

use clap::Parser;
use tracing::{error, info};

use arch_installer::{
    cli::Cli,
    cmd::SystemRunner,
    config::InstallConfig,
    error::InstallerError,
    logging,
    menu::{Installer, Outcome},
    precheck,
    session::ConfigStore,
    steps::uefi,
    ui::{self, DialoguerPrompt},
};

// ── Exit codes ────────────────────────────────────────────────────────────────

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_PRECONDITION: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

fn exit_code(err: &InstallerError) -> i32 {
    match err {
        e if e.is_precondition() => EXIT_PRECONDITION,
        InstallerError::Prompt(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => {
            EXIT_INTERRUPTED
        }
        _ => EXIT_FAILURE,
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("installer stopped: {}", e);
            println!();
            ui::print_error(&e.to_string());
            exit_code(&e)
        }
    };
    process::exit(code);
}

fn run(cli: &Cli) -> Result<i32, InstallerError> {
    let log_file = logging::init();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        dry_run = cli.dry_run,
        auto = cli.auto,
        "arch-installer starting"
    );

    ui::print_banner();
    if log_file.is_none() {
        ui::print_warning("No writable log location; continuing without a log file.");
    }

    // ── Prerequisites ─────────────────────────────────────────────────────────
    ui::print_step(1, 2, "Prerequisites");
    let mut runner = SystemRunner::new(cli.dry_run);
    precheck::run(&mut runner, cli.dry_run)?;

    // ── Configuration ─────────────────────────────────────────────────────────
    let store = ConfigStore::new(&cli.config);
    let mut state = if store.exists() {
        ui::print_info(&format!("Loaded configuration from {}", store.path().display()));
        store.load()
    } else {
        InstallConfig::default()
    };
    let bootloader = state.bootloader();
    state.set_uefi(uefi::detect(cli.dry_run));
    state.set_bootloader(bootloader);
    if let Some(lang) = cli.lang {
        state.language = lang;
    }

    ui::print_step(2, 2, "Configuration");
    let mut prompt = DialoguerPrompt::new(state.language);
    let mut installer = Installer::new(state, &mut runner, &mut prompt, store)
        .dry_run(cli.dry_run)
        .log_file(log_file.unwrap_or_else(|| PathBuf::from(logging::LOG_FILE)));

    let outcome = if cli.auto {
        installer.run_unattended()?
    } else {
        installer.run()?
    };

    Ok(match outcome {
        Outcome::Exited | Outcome::Installed { .. } => EXIT_OK,
        Outcome::Failed(_) => EXIT_FAILURE,
    })
}

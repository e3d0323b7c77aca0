use clap::Parser;
use std::path::PathBuf;

use crate::{labels::Language, session::DEFAULT_CONFIG_FILE};

/// Menu-driven Arch Linux installer
#[derive(Debug, Parser)]
#[command(name = "arch-installer")]
#[command(about = "Interactive, menu-driven Arch Linux installer")]
#[command(version)]
pub struct Cli {
    /// Configuration file used by save/load. Loaded at start when it exists.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Unattended mode: load the configuration, ask only for missing
    /// mandatory values, then install without the menu or final review.
    #[arg(long)]
    pub auto: bool,

    /// Interface language. Defaults to the saved one, then English.
    #[arg(long, value_enum)]
    pub lang: Option<Language>,

    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Read-only probes (lsblk, lspci) still run so the menus are realistic.
    /// Firmware is reported as UEFI and the root check is skipped.
    #[arg(long)]
    pub dry_run: bool,
}

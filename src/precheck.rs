//! Live-environment checks run once before the menu appears.

use std::fs;

use tracing::{info, warn};

use crate::{
    cmd::{package_for, Cmd, CommandRunner},
    error::InstallerError,
    ui,
};

/// Tools the pipeline cannot work without.
pub const REQUIRED_TOOLS: [&str; 7] = [
    "lsblk",
    "sgdisk",
    "parted",
    "mkfs.ext4",
    "pacstrap",
    "arch-chroot",
    "genfstab",
];

const PING_HOST: &str = "archlinux.org";

const DRY_RUN_BANNER: &str =
    "DRY-RUN MODE: no disk will be touched, only read-only probes will run.";

/// Root, network, tools, keyring, in that order. Only the first three can
/// stop the installer. Dry-run mode skips the root check and only warns
/// about the other two.
pub fn run(runner: &mut dyn CommandRunner, dry_run: bool) -> Result<(), InstallerError> {
    if dry_run {
        ui::print_warning(DRY_RUN_BANNER);
    } else {
        check_root()?;
    }
    soft(check_network(runner), dry_run)?;
    soft(check_tools(runner), dry_run)?;
    init_keyring(runner);
    log_system_summary();
    Ok(())
}

/// In dry-run mode a failed check is reported and ignored.
fn soft(result: Result<(), InstallerError>, dry_run: bool) -> Result<(), InstallerError> {
    match result {
        Err(e) if dry_run => {
            warn!("dry-run: ignoring failed check: {}", e);
            ui::print_warning(&format!("{} (ignored in dry-run mode)", e));
            Ok(())
        }
        other => other,
    }
}

// ── Root ──────────────────────────────────────────────────────────────────────

pub fn check_root() -> Result<(), InstallerError> {
    // Unreadable status counts as non-root.
    let euid = fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| effective_uid(&s))
        .unwrap_or(u32::MAX);

    if euid != 0 {
        return Err(InstallerError::NotRoot);
    }
    Ok(())
}

/// Second field of the `Uid:` line (real, effective, saved, fs).
fn effective_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find(|l| l.starts_with("Uid:"))
        .and_then(|l| l.split_whitespace().nth(2))
        .and_then(|v| v.parse().ok())
}

// ── Network ───────────────────────────────────────────────────────────────────

pub fn check_network(runner: &mut dyn CommandRunner) -> Result<(), InstallerError> {
    let pb = ui::spinner(format!("Checking connection to {}…", PING_HOST));
    let ping = Cmd::new("ping").args(["-c", "1", "-W", "5", PING_HOST]).probe();
    let online = runner.run(&ping, false).map(|o| o.success()).unwrap_or(false);

    if !online {
        pb.finish_and_clear();
        return Err(InstallerError::NoNetwork);
    }
    ui::done_spinner(pb, "Network connection OK.");
    Ok(())
}

// ── Tools ─────────────────────────────────────────────────────────────────────

/// Fails on the first missing tool and tells the operator which package
/// provides it.
pub fn check_tools(runner: &mut dyn CommandRunner) -> Result<(), InstallerError> {
    for tool in REQUIRED_TOOLS {
        if !runner.exists(tool) {
            ui::print_info(&format!("Install it with:  pacman -S {}", package_for(tool)));
            return Err(InstallerError::MissingTool(tool.to_string()));
        }
    }
    ui::print_success("All required tools are present.");
    Ok(())
}

// ── Keyring ───────────────────────────────────────────────────────────────────

/// A stale keyring shows up later as signature errors, so this never blocks.
pub fn init_keyring(runner: &mut dyn CommandRunner) {
    let pb = ui::spinner("Initializing pacman keyring…");
    let steps = [
        Cmd::new("pacman-key").arg("--init"),
        Cmd::new("pacman-key").args(["--populate", "archlinux"]),
    ];

    for cmd in &steps {
        if let Err(e) = runner.run(cmd, true) {
            pb.finish_and_clear();
            warn!("keyring initialisation failed: {}", e);
            ui::print_warning("Could not initialize the pacman keyring; continuing anyway.");
            return;
        }
    }
    ui::done_spinner(pb, "Pacman keyring ready.");
}

// ── System summary ────────────────────────────────────────────────────────────

fn log_system_summary() {
    let mem_kb = fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|s| mem_total_kb(&s))
        .unwrap_or(0);
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let firmware = if std::path::Path::new("/sys/firmware/efi/efivars").is_dir() {
        "UEFI"
    } else {
        "BIOS"
    };
    info!(memory_mb = mem_kb / 1024, cpus, firmware, "system summary");
}

fn mem_total_kb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|l| l.starts_with("MemTotal:"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|v| v.parse().ok())
}

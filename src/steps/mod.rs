//! Stage modules. Each one owns a slice of [`InstallConfig`](crate::config::InstallConfig):
//! a `select*` routine that asks the operator, and `apply*` routines the
//! pipeline calls to change the target system.

pub mod bootloader;
pub mod chroot;
pub mod desktop;
pub mod fstab;
pub mod graphics;
pub mod locale;
pub mod mount;
pub mod network;
pub mod packages;
pub mod partition;
pub mod uefi;
pub mod users;

use std::path::PathBuf;

use tracing::warn;

use crate::{
    cmd::{Cmd, CommandOutput, CommandRunner},
    error::InstallerError,
};

/// Where the new system is assembled.
pub const TARGET_ROOT: &str = "/mnt";

/// The system being installed, as seen by the `apply*` routines.
///
/// Wraps the command runner, knows the mount root, and collects the
/// warnings of best-effort sub-steps so the pipeline can report them.
pub struct Target<'a> {
    runner: &'a mut dyn CommandRunner,
    root: PathBuf,
    warnings: Vec<String>,
}

impl<'a> Target<'a> {
    pub fn new(runner: &'a mut dyn CommandRunner, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            root: root.into(),
            warnings: Vec::new(),
        }
    }

    pub fn dry_run(&self) -> bool {
        self.runner.dry_run()
    }

    pub fn root_str(&self) -> String {
        self.root.display().to_string()
    }

    /// `/etc/hostname` → `/mnt/etc/hostname`.
    pub fn path(&self, inside: &str) -> PathBuf {
        self.root.join(inside.trim_start_matches('/'))
    }

    /// Runs `program args…` inside the new system via `arch-chroot`.
    pub fn chroot<I, S>(&self, program: &str, args: I) -> Cmd
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cmd::new("arch-chroot")
            .arg(self.root_str())
            .arg(program)
            .args(args)
    }

    /// `arch-chroot <root> pacman -S --needed --noconfirm <packages>`.
    pub fn pacman_install(&self, packages: &[impl AsRef<str>]) -> Cmd {
        self.chroot("pacman", ["-S", "--needed", "--noconfirm"])
            .args(packages.iter().map(|p| p.as_ref().to_string()))
    }

    /// Runs a command that must succeed.
    pub fn run(&mut self, cmd: Cmd) -> Result<CommandOutput, InstallerError> {
        self.runner.run(&cmd, true)
    }

    /// Runs a command whose exit status the caller inspects (or ignores).
    pub fn try_run(&mut self, cmd: Cmd) -> Result<CommandOutput, InstallerError> {
        self.runner.run(&cmd, false)
    }

    pub fn interactive(&mut self, cmd: Cmd) -> Result<(), InstallerError> {
        self.runner.interactive(&cmd)
    }

    /// Writes a file inside the target root.
    pub fn write(&mut self, inside: &str, contents: &str) -> Result<(), InstallerError> {
        let path = self.path(inside);
        self.runner.write_file(&path, contents, false)
    }

    pub fn append(&mut self, inside: &str, contents: &str) -> Result<(), InstallerError> {
        let path = self.path(inside);
        self.runner.write_file(&path, contents, true)
    }

    /// Runs a best-effort sub-step: failures become warnings.
    pub fn best_effort(
        &mut self,
        what: &str,
        step: impl FnOnce(&mut Self) -> Result<(), InstallerError>,
    ) {
        if let Err(e) = step(self) {
            self.warn(format!("{}: {}", what, e));
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

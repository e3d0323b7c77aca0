//! The installation run: fifteen stages in a fixed order, each either fatal
//! or best-effort on failure.

use std::fmt;

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    cmd::CommandRunner,
    config::InstallConfig,
    error::InstallerError,
    progress::{self, Progress},
    prompt::Prompt,
    steps::{
        bootloader, desktop, fstab, graphics, locale, mount, network, packages, partition, users,
        Target, TARGET_ROOT,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Partition,
    Mount,
    Mirrors,
    BaseSystem,
    Kernel,
    Fstab,
    Locale,
    Timezone,
    Hostname,
    Bootloader,
    GpuDrivers,
    Desktop,
    Users,
    ExtraPackages,
    Services,
}

/// What a stage failure does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Stop the run; `installation_completed` stays false.
    Fatal,
    /// Record a warning and carry on.
    BestEffort,
}

impl Stage {
    pub fn policy(self) -> Policy {
        match self {
            Stage::Mirrors
            | Stage::GpuDrivers
            | Stage::Desktop
            | Stage::ExtraPackages
            | Stage::Services => Policy::BestEffort,
            _ => Policy::Fatal,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn label_key(self) -> &'static str {
        progress::STAGES[self.index()].0
    }

    pub fn percent(self) -> u8 {
        progress::STAGES[self.index()].1
    }

    fn apply(self, target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
        match self {
            Stage::Partition => partition::apply(target, state),
            Stage::Mount => mount::apply(target, state),
            Stage::Mirrors => packages::update_mirrors(target, state),
            Stage::BaseSystem => packages::install_base(target),
            Stage::Kernel => packages::install_kernel(target, state.kernel),
            Stage::Fstab => fstab::generate(target),
            Stage::Locale => locale::apply_locale(target, state),
            Stage::Timezone => locale::apply_timezone(target, &state.timezone),
            Stage::Hostname => network::apply_hostname(target, &state.hostname),
            Stage::Bootloader => bootloader::apply(target, state),
            Stage::GpuDrivers => match state.gpu_driver {
                Some(driver) => graphics::apply(target, driver),
                None => {
                    info!("no graphics driver selected");
                    Ok(())
                }
            },
            Stage::Desktop => match state.desktop_environment {
                Some(de) => desktop::apply(target, de),
                None => {
                    info!("no desktop environment selected");
                    Ok(())
                }
            },
            Stage::Users => {
                users::set_root_password(target, state)?;
                users::create_user(target, state)
            }
            Stage::ExtraPackages => packages::install_extras(target, state),
            Stage::Services => network::apply_services(target, state.network_manager),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag: &'static str = (*self).into();
        f.write_str(tag)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Installation has already been started in this session")]
    AlreadyStarted,

    #[error("Configuration incomplete: {0} is not set")]
    Incomplete(&'static str),

    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: InstallerError,
    },
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct Report {
    pub executed: Vec<Stage>,
    /// Best-effort failures, in the order they happened.
    pub warnings: Vec<(Stage, String)>,
}

/// Runs every stage against [`TARGET_ROOT`].
pub fn run(
    state: &mut InstallConfig,
    runner: &mut dyn CommandRunner,
    prompt: &mut dyn Prompt,
) -> Result<Report, PipelineError> {
    run_at(state, runner, prompt, TARGET_ROOT)
}

/// Runs every stage in order. Refuses to start twice per [`InstallConfig`]
/// and before the mandatory values are set.
pub fn run_at(
    state: &mut InstallConfig,
    runner: &mut dyn CommandRunner,
    prompt: &mut dyn Prompt,
    root: &str,
) -> Result<Report, PipelineError> {
    if state.installation_started() {
        return Err(PipelineError::AlreadyStarted);
    }
    if let Some(key) = state.missing_for_install().into_iter().next() {
        return Err(PipelineError::Incomplete(key));
    }
    state.mark_started();
    info!(root, "installation started");

    let mut target = Target::new(runner, root);
    let mut progress = Progress::new(prompt);
    let mut report = Report::default();
    progress.start("installation_progress");

    for (i, stage) in Stage::iter().enumerate() {
        progress.stage(i);
        info!(stage = %stage, percent = stage.percent(), "stage started");

        let result = stage.apply(&mut target, state);
        for w in target.take_warnings() {
            report.warnings.push((stage, w));
        }

        match (result, stage.policy()) {
            (Ok(()), _) => {}
            (Err(e), Policy::BestEffort) => {
                warn!(stage = %stage, "best-effort stage failed: {}", e);
                report.warnings.push((stage, e.to_string()));
            }
            (Err(e), Policy::Fatal) => {
                error!(stage = %stage, "fatal stage failed: {}", e);
                progress.stop();
                return Err(PipelineError::StageFailed { stage, source: e });
            }
        }
        report.executed.push(stage);
    }

    progress.set_percent(100, "installation_complete");
    progress.stop();
    state.mark_completed();
    info!(warnings = report.warnings.len(), "installation completed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cmd::SystemRunner,
        steps::graphics::GpuDriver,
        testing::{ready_state, FakeRunner, ScriptedPrompt},
    };

    fn runner() -> FakeRunner {
        let mut runner = FakeRunner::default();
        runner.respond("genfstab", "UUID=1 / ext4 rw 0 1\n");
        runner
    }

    #[test]
    fn every_stage_runs_in_order() {
        let mut state = ready_state();
        let mut runner = runner();
        let mut prompt = ScriptedPrompt::new(vec![]);

        let report = run(&mut state, &mut runner, &mut prompt).unwrap();
        assert_eq!(report.executed, Stage::iter().collect::<Vec<_>>());
        assert!(report.warnings.is_empty());
        assert!(state.installation_completed());

        let order = [
            "sgdisk --zap-all",
            "mkfs.ext4",
            "mount /dev/sda2 /mnt",
            "reflector",
            "pacstrap -K /mnt base",
            "pacstrap /mnt linux linux-firmware",
            "genfstab",
            "locale-gen",
            "/etc/localtime",
            "write /mnt/etc/hostname",
            "grub-install",
            "chpasswd",
            "systemctl enable NetworkManager",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|n| runner.position(n).unwrap_or_else(|| panic!("'{}' never ran", n)))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);

        assert_eq!(prompt.gauge.last(), Some(&(100, "installation_complete".to_string())));
        assert!(!prompt.gauge_active);
    }

    #[test]
    fn base_system_failure_stops_the_run() {
        let mut state = ready_state();
        let mut runner = runner();
        runner.fail_on("pacstrap -K");
        let mut prompt = ScriptedPrompt::new(vec![]);

        let err = run(&mut state, &mut runner, &mut prompt).unwrap_err();
        assert!(matches!(err, PipelineError::StageFailed { stage: Stage::BaseSystem, .. }));
        assert!(!runner.ran("pacstrap /mnt linux"));
        assert!(!runner.ran("genfstab"));
        assert!(state.installation_started());
        assert!(!state.installation_completed());
        assert!(!prompt.gauge_active);
    }

    #[test]
    fn mirror_failure_is_only_a_warning() {
        let mut state = ready_state();
        let mut runner = runner();
        runner.fail_on("reflector");
        let mut prompt = ScriptedPrompt::new(vec![]);

        let report = run(&mut state, &mut runner, &mut prompt).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].0, Stage::Mirrors);
        assert!(state.installation_completed());
        assert_eq!(prompt.gauge.last(), Some(&(100, "installation_complete".to_string())));
    }

    #[test]
    fn desktop_failure_continues_to_users() {
        let mut state = ready_state();
        state.desktop_environment = Some(crate::steps::desktop::DesktopEnvironment::Xfce);
        let mut runner = runner();
        runner.fail_on("xfce4");
        let mut prompt = ScriptedPrompt::new(vec![]);

        let report = run(&mut state, &mut runner, &mut prompt).unwrap();
        assert_eq!(report.warnings[0].0, Stage::Desktop);
        assert!(runner.ran("chpasswd"));
    }

    #[test]
    fn dry_run_reaches_the_end() {
        let root = tempfile::tempdir().unwrap();
        let mut state = ready_state();
        let mut runner = SystemRunner::new(true);
        let mut prompt = ScriptedPrompt::new(vec![]);

        let report = run_at(&mut state, &mut runner, &mut prompt, &root.path().display().to_string())
            .unwrap();
        assert_eq!(report.executed.len(), 15);
        assert!(state.installation_completed());
    }

    #[test]
    fn sudo_is_installed_before_sudoers_is_edited() {
        let mut state = ready_state();
        state.username = Some("alice".into());
        state.user_password = Some(crate::config::Secret::new("alicepw1"));
        let mut runner = runner();
        let mut prompt = ScriptedPrompt::new(vec![]);
        run(&mut state, &mut runner, &mut prompt).unwrap();

        let install = runner.position("--noconfirm sudo").unwrap();
        let edit = runner.position("/mnt/etc/sudoers").unwrap();
        assert!(install < edit);
    }

    #[test]
    fn second_run_is_rejected() {
        let mut state = ready_state();
        let mut runner = runner();
        let mut prompt = ScriptedPrompt::new(vec![]);
        run(&mut state, &mut runner, &mut prompt).unwrap();

        let mut second = FakeRunner::default();
        let err = run(&mut state, &mut second, &mut prompt).unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyStarted));
        assert!(second.log.is_empty());
    }

    #[test]
    fn incomplete_state_never_starts() {
        let mut state = ready_state();
        state.root_password = None;
        let mut runner = runner();
        let mut prompt = ScriptedPrompt::new(vec![]);

        let err = run(&mut state, &mut runner, &mut prompt).unwrap_err();
        assert!(matches!(err, PipelineError::Incomplete("root_password")));
        assert!(!state.installation_started());
        assert!(runner.log.is_empty());
    }

    #[test]
    fn nvidia_switch_removes_before_installing() {
        let mut state = ready_state();
        state.gpu_driver = Some(GpuDriver::NvidiaOpensource);
        let mut runner = runner();
        let mut prompt = ScriptedPrompt::new(vec![]);
        run(&mut state, &mut runner, &mut prompt).unwrap();

        let removal = runner.position("pacman -Rns --noconfirm nvidia").unwrap();
        let install = runner.position("xf86-video-nouveau mesa").unwrap();
        assert!(removal < install);
    }

    #[test]
    fn fatal_policy_table() {
        let best_effort: Vec<Stage> = Stage::iter()
            .filter(|s| s.policy() == Policy::BestEffort)
            .collect();
        assert_eq!(
            best_effort,
            vec![
                Stage::Mirrors,
                Stage::GpuDrivers,
                Stage::Desktop,
                Stage::ExtraPackages,
                Stage::Services
            ]
        );
        assert_eq!(Stage::Services.percent(), 100);
        assert_eq!(Stage::BaseSystem.label_key(), "installing_base");
    }
}

//! The installation pipeline driven through the public collaborator traits.

use std::path::Path;

use arch_installer::{
    cmd::{Cmd, CommandOutput, CommandRunner},
    config::{InstallConfig, Secret},
    error::InstallerError,
    labels::Language,
    pipeline::{self, PipelineError, Stage},
    prompt::{Answer, ChoiceItem, Prompt, Selection},
    steps::{
        bootloader::Bootloader,
        desktop::DesktopEnvironment,
        partition::{PartitionScheme, SwapKind},
    },
};

/// Succeeds at everything and remembers what it was asked to do.
#[derive(Default)]
struct Recorder {
    log: Vec<String>,
    fail: Option<&'static str>,
}

impl Recorder {
    fn index_of(&self, needle: &str) -> usize {
        self.log
            .iter()
            .position(|l| l.contains(needle))
            .unwrap_or_else(|| panic!("'{}' never ran", needle))
    }
}

impl CommandRunner for Recorder {
    fn exec(&mut self, cmd: &Cmd) -> Result<CommandOutput, InstallerError> {
        let line = cmd.to_string();
        let failed = self.fail.map_or(false, |f| line.contains(f));
        let stdout = if line.starts_with("genfstab") {
            "UUID=abcd / btrfs rw,subvol=@ 0 0\n".to_string()
        } else if line.starts_with("findmnt") {
            "abcd-1234\n".to_string()
        } else {
            String::new()
        };
        self.log.push(line);
        Ok(CommandOutput {
            status: if failed { 1 } else { 0 },
            stdout,
            stderr: String::new(),
        })
    }

    fn interactive(&mut self, cmd: &Cmd) -> Result<(), InstallerError> {
        self.log.push(cmd.to_string());
        Ok(())
    }

    fn write_file(&mut self, path: &Path, _contents: &str, _append: bool) -> Result<(), InstallerError> {
        self.log.push(format!("write {}", path.display()));
        Ok(())
    }
}

/// The pipeline never asks questions; it only drives the gauge.
#[derive(Default)]
struct GaugeOnly {
    percents: Vec<u8>,
}

impl Prompt for GaugeOnly {
    fn message(&mut self, _key: &str) -> Result<(), InstallerError> {
        Ok(())
    }
    fn confirm(&mut self, key: &str) -> Result<bool, InstallerError> {
        panic!("unexpected confirmation '{}'", key)
    }
    fn text(&mut self, key: &str, _initial: &str) -> Selection<String> {
        panic!("unexpected text prompt '{}'", key)
    }
    fn secret(&mut self, key: &str) -> Selection<String> {
        panic!("unexpected password prompt '{}'", key)
    }
    fn single_choice(&mut self, key: &str, _items: &[ChoiceItem]) -> Selection<String> {
        panic!("unexpected choice '{}'", key)
    }
    fn multi_choice(&mut self, key: &str, _items: &[ChoiceItem]) -> Selection<Vec<String>> {
        panic!("unexpected checklist '{}'", key)
    }
    fn menu(&mut self, _key: &str, _items: &[(String, String)]) -> Selection<String> {
        Ok(Answer::Cancelled)
    }
    fn gauge_start(&mut self, _key: &str) {}
    fn gauge_update(&mut self, percent: u8, _key: &str) {
        self.percents.push(percent);
    }
    fn gauge_stop(&mut self) {}
    fn set_language(&mut self, _language: Language) {}
}

fn btrfs_uefi_desktop() -> InstallConfig {
    let mut state = InstallConfig::default();
    state.disk = Some("/dev/vda".into());
    state.partition_scheme = Some(PartitionScheme::AutoBtrfs);
    state.swap = SwapKind::File;
    state.set_uefi(true);
    state.set_bootloader(Bootloader::SystemdBoot);
    state.desktop_environment = Some(DesktopEnvironment::Kde);
    state.root_password = Some(Secret::new("rootpw1"));
    state.username = Some("alice".into());
    state.user_password = Some(Secret::new("alicepw1"));
    state
}

#[test]
fn full_run_touches_the_system_in_stage_order() {
    let mut state = btrfs_uefi_desktop();
    let mut runner = Recorder::default();
    let mut prompt = GaugeOnly::default();

    let report = pipeline::run(&mut state, &mut runner, &mut prompt).unwrap();
    assert_eq!(report.executed.len(), 15);
    assert!(state.installation_completed());

    let milestones = [
        "mkfs.btrfs",
        "btrfs subvolume create",
        "pacstrap -K /mnt base",
        "genfstab",
        "locale-gen",
        "bootctl",
        "write /mnt/boot/loader/entries/arch.conf",
        "systemctl enable sddm",
        "useradd",
        "systemctl enable NetworkManager",
    ];
    let positions: Vec<usize> = milestones.iter().map(|m| runner.index_of(m)).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);

    assert!(prompt.percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(prompt.percents.last(), Some(&100));
}

#[test]
fn fatal_failure_skips_everything_after_it() {
    let mut state = btrfs_uefi_desktop();
    let mut runner = Recorder {
        fail: Some("genfstab"),
        ..Recorder::default()
    };
    let mut prompt = GaugeOnly::default();

    match pipeline::run(&mut state, &mut runner, &mut prompt) {
        Err(PipelineError::StageFailed { stage, .. }) => assert_eq!(stage, Stage::Fstab),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!runner.log.iter().any(|l| l.contains("locale-gen")));
    assert!(!state.installation_completed());

    let again = pipeline::run(&mut state, &mut Recorder::default(), &mut prompt);
    assert!(matches!(again, Err(PipelineError::AlreadyStarted)));
}

#[test]
fn best_effort_failure_is_reported_not_raised() {
    let mut state = btrfs_uefi_desktop();
    let mut runner = Recorder {
        fail: Some("plasma"),
        ..Recorder::default()
    };
    let mut prompt = GaugeOnly::default();

    let report = pipeline::run(&mut state, &mut runner, &mut prompt).unwrap();
    assert!(report.warnings.iter().any(|(stage, _)| *stage == Stage::Desktop));
    assert!(runner.log.iter().any(|l| l.contains("useradd")));
    assert!(state.installation_completed());
}

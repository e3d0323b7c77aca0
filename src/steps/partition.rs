use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::{info, warn};

use crate::{
    cmd::{Cmd, CommandRunner},
    config::{InstallConfig, DEFAULT_SWAP_GB},
    error::InstallerError,
    lsblk,
    prompt::{Answer, ChoiceItem, Prompt, Selection},
    steps::Target,
};

pub const ESP_SIZE: &str = "+512M";

/// Btrfs subvolumes and where each is mounted. `@snapshots` is created
/// but left unmounted.
pub const SUBVOLUMES: [(&str, Option<&str>); 4] = [
    ("@", Some("/")),
    ("@home", Some("/home")),
    ("@var", Some("/var")),
    ("@snapshots", None),
];

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString, IntoStaticStr,
)]
pub enum PartitionScheme {
    #[serde(rename = "auto_ext4")]
    #[strum(serialize = "auto_ext4")]
    AutoExt4,
    #[serde(rename = "auto_btrfs")]
    #[strum(serialize = "auto_btrfs")]
    AutoBtrfs,
    #[serde(rename = "manual")]
    #[strum(serialize = "manual")]
    Manual,
}

impl PartitionScheme {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    /// Label keys share the tag.
    pub fn label_key(self) -> &'static str {
        self.tag()
    }

    pub fn filesystem(self) -> Option<Filesystem> {
        match self {
            PartitionScheme::AutoExt4 => Some(Filesystem::Ext4),
            PartitionScheme::AutoBtrfs => Some(Filesystem::Btrfs),
            PartitionScheme::Manual => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SwapKind {
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    NoSwap,
    #[default]
    File,
    Partition,
}

impl SwapKind {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn label_key(self) -> &'static str {
        match self {
            SwapKind::NoSwap => "swap_none",
            SwapKind::File => "swap_file",
            SwapKind::Partition => "swap_partition",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filesystem {
    Ext4,
    Btrfs,
}

/// Partition paths derived from the disk, scheme and firmware mode.
///
/// UEFI: p1 = EFI system partition, p2 = root, p3 = swap (optional).
/// BIOS: p1 = root, p2 = swap (optional), no boot partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub disk: String,
    pub esp: Option<String>,
    pub root: String,
    pub swap: Option<String>,
    /// `None` for manual partitioning.
    pub filesystem: Option<Filesystem>,
}

impl Layout {
    pub fn plan(state: &InstallConfig) -> Result<Self, InstallerError> {
        let disk = state.disk.clone().ok_or(InstallerError::Incomplete("disk"))?;
        let scheme = state
            .partition_scheme
            .ok_or(InstallerError::Incomplete("partition_scheme"))?;
        let with_swap = scheme != PartitionScheme::Manual
            && state.swap == SwapKind::Partition
            && state.swap_size > 0;

        let (esp, root, swap) = if state.is_uefi() {
            (
                Some(part_path(&disk, 1)),
                part_path(&disk, 2),
                with_swap.then(|| part_path(&disk, 3)),
            )
        } else {
            (None, part_path(&disk, 1), with_swap.then(|| part_path(&disk, 2)))
        };

        Ok(Self {
            esp,
            root,
            swap,
            filesystem: scheme.filesystem(),
            disk,
        })
    }
}

/// `/dev/sda` + 2 → `/dev/sda2`, `/dev/nvme0n1` + 2 → `/dev/nvme0n1p2`.
pub fn part_path(disk: &str, n: u8) -> String {
    if disk.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{}p{}", disk, n)
    } else {
        format!("{}{}", disk, n)
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Lets the operator pick the target disk. Requires an explicit
/// confirmation that the disk will be erased.
pub fn select_disk(
    prompt: &mut dyn Prompt,
    runner: &mut dyn CommandRunner,
    current: Option<&str>,
) -> Selection<String> {
    let disks = lsblk::list_disks(runner);
    if disks.is_empty() {
        prompt.message("error_disk_not_found")?;
        return Ok(Answer::Cancelled);
    }

    let items: Vec<ChoiceItem> = disks
        .iter()
        .map(|d| ChoiceItem::new(&d.path, d.display(), Some(d.path.as_str()) == current))
        .collect();

    let Answer::Given(disk) = prompt.single_choice("select_disk", &items)? else {
        return Ok(Answer::Cancelled);
    };

    if !prompt.confirm("confirm_disk")? {
        return Ok(Answer::Cancelled);
    }

    info!(disk = %disk, "disk selected");
    Ok(Answer::Given(disk))
}

pub fn select_scheme(
    prompt: &mut dyn Prompt,
    current: Option<PartitionScheme>,
) -> Selection<PartitionScheme> {
    let items: Vec<ChoiceItem> = PartitionScheme::iter()
        .map(|s| ChoiceItem::new(s.tag(), s.label_key(), Some(s) == current))
        .collect();

    Ok(prompt
        .single_choice("partition_scheme", &items)?
        .map(|tag| tag.parse().unwrap_or(PartitionScheme::AutoExt4)))
}

/// Returns the swap variant and its size in GB.
pub fn select_swap(prompt: &mut dyn Prompt, state: &InstallConfig) -> Selection<(SwapKind, u32)> {
    let items: Vec<ChoiceItem> = SwapKind::iter()
        .map(|k| ChoiceItem::new(k.tag(), k.label_key(), k == state.swap))
        .collect();

    let Answer::Given(tag) = prompt.single_choice("select_swap", &items)? else {
        return Ok(Answer::Cancelled);
    };

    let choice = match tag.parse().unwrap_or_default() {
        SwapKind::NoSwap => (SwapKind::NoSwap, 0),
        SwapKind::File => {
            let initial = DEFAULT_SWAP_GB.to_string();
            let size = prompt
                .text("swap_size", &initial)?
                .given()
                .map(|s| parse_swap_size(&s))
                .unwrap_or(DEFAULT_SWAP_GB);
            (SwapKind::File, size)
        }
        // sized by the partitioning step
        SwapKind::Partition => {
            let size = if state.swap_size == 0 { DEFAULT_SWAP_GB } else { state.swap_size };
            (SwapKind::Partition, size)
        }
    };
    Ok(Answer::Given(choice))
}

/// Integer GB; anything unparsable or zero becomes the default.
pub fn parse_swap_size(input: &str) -> u32 {
    input
        .trim()
        .trim_end_matches(['G', 'g'])
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SWAP_GB)
}

// ── Apply ─────────────────────────────────────────────────────────────────────

/// Creates the partition table, partitions and filesystems.
pub fn apply(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    let layout = Layout::plan(state)?;

    let Some(fs) = layout.filesystem else {
        return run_manual(target, &layout.disk);
    };

    // Leftovers from a previous attempt.
    target.try_run(Cmd::new("umount").args(["-R", &target.root_str()]))?;
    if let Some(ref swap) = layout.swap {
        target.try_run(Cmd::new("swapoff").arg(swap))?;
    }

    if state.is_uefi() {
        create_gpt(target, &layout, state.swap_size)?;
    } else {
        create_msdos(target, &layout, fs, state.swap_size)?;
    }
    target.try_run(Cmd::new("partprobe").arg(&layout.disk))?;

    match fs {
        Filesystem::Ext4 => {
            target.run(Cmd::new("mkfs.ext4").args(["-F", &layout.root]))?;
        }
        Filesystem::Btrfs => {
            target.run(Cmd::new("mkfs.btrfs").args(["-f", &layout.root]))?;
        }
    }
    if let Some(ref esp) = layout.esp {
        target.run(Cmd::new("mkfs.fat").args(["-F", "32", esp]))?;
    }
    if let Some(ref swap) = layout.swap {
        target.run(Cmd::new("mkswap").arg(swap))?;
    }

    if fs == Filesystem::Btrfs {
        create_subvolumes(target, &layout.root)?;
    }

    info!(disk = %layout.disk, "partitioning completed");
    Ok(())
}

fn run_manual(target: &mut Target<'_>, disk: &str) -> Result<(), InstallerError> {
    info!(disk, "opening manual partitioning tool");
    // The result is not inspected; the operator owns the layout.
    match target.interactive(Cmd::new("cfdisk").arg(disk)) {
        Err(e @ InstallerError::CommandNotFound(_)) => Err(e),
        Err(e) => {
            warn!("cfdisk exited with an error: {}", e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn create_gpt(target: &mut Target<'_>, layout: &Layout, swap_gb: u32) -> Result<(), InstallerError> {
    let disk = layout.disk.as_str();
    target.run(Cmd::new("sgdisk").args(["--zap-all", disk]))?;
    target.run(Cmd::new("sgdisk").args(["-n", &format!("1:0:{}", ESP_SIZE), "-t", "1:ef00", disk]))?;

    if layout.swap.is_some() {
        let root_end = format!("2:0:-{}G", swap_gb);
        target.run(Cmd::new("sgdisk").args(["-n", &root_end, "-t", "2:8300", disk]))?;
        target.run(Cmd::new("sgdisk").args(["-n", "3:0:0", "-t", "3:8200", disk]))?;
    } else {
        target.run(Cmd::new("sgdisk").args(["-n", "2:0:0", "-t", "2:8300", disk]))?;
    }
    Ok(())
}

fn create_msdos(
    target: &mut Target<'_>,
    layout: &Layout,
    fs: Filesystem,
    swap_gb: u32,
) -> Result<(), InstallerError> {
    let disk = layout.disk.as_str();
    let fs_type = match fs {
        Filesystem::Ext4 => "ext4",
        Filesystem::Btrfs => "btrfs",
    };

    target.run(Cmd::new("wipefs").args(["-a", disk]))?;
    target.run(Cmd::new("parted").args(["-s", disk, "mklabel", "msdos"]))?;

    let root_end = if layout.swap.is_some() {
        format!("-{}GiB", swap_gb)
    } else {
        "100%".to_string()
    };
    target.run(
        Cmd::new("parted").args(["-s", disk, "--", "mkpart", "primary", fs_type, "1MiB", &root_end]),
    )?;
    target.run(Cmd::new("parted").args(["-s", disk, "set", "1", "boot", "on"]))?;

    if layout.swap.is_some() {
        target.run(Cmd::new("parted").args([
            "-s", disk, "--", "mkpart", "primary", "linux-swap", &root_end, "100%",
        ]))?;
    }
    Ok(())
}

fn create_subvolumes(target: &mut Target<'_>, root: &str) -> Result<(), InstallerError> {
    let mnt = target.root_str();
    target.run(Cmd::new("mount").args([root, &mnt]))?;
    for (name, _) in SUBVOLUMES {
        target.run(Cmd::new("btrfs").args(["subvolume", "create", &format!("{}/{}", mnt, name)]))?;
    }
    target.run(Cmd::new("umount").arg(&mnt))?;
    Ok(())
}

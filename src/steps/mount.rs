use tracing::info;

use crate::{
    cmd::Cmd,
    config::InstallConfig,
    error::InstallerError,
    steps::{
        partition::{Filesystem, Layout, SwapKind, SUBVOLUMES},
        Target,
    },
};

const SWAPFILE: &str = "/swapfile";

/// Mounts all partitions into the installation tree.
///
/// Mount order:
///   1. Root  → /mnt (btrfs: subvolume `@`, then `@home`, `@var`)
///   2. ESP   → /mnt/boot/efi or /mnt/boot, depending on the bootloader
///   3. Swap  → swapon (partition) or a fresh swap file
///
/// Manual layouts are mounted by the operator; only the root mount is verified.
pub fn apply(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    let layout = Layout::plan(state)?;
    let mnt = target.root_str();

    let Some(fs) = layout.filesystem else {
        let mounted = target.try_run(Cmd::new("mountpoint").args(["-q", &mnt]))?;
        if !mounted.success() {
            return Err(InstallerError::Target(format!(
                "manual layout: nothing is mounted at {}",
                mnt
            )));
        }
        add_swapfile(target, state, None);
        return Ok(());
    };

    // 1. Root
    match fs {
        Filesystem::Ext4 => {
            target.run(Cmd::new("mount").args([&layout.root, &mnt]))?;
        }
        Filesystem::Btrfs => {
            target.run(Cmd::new("mount").args(["-o", "subvol=@", &layout.root, &mnt]))?;
            for (name, point) in SUBVOLUMES {
                let Some(point) = point.filter(|p| *p != "/") else { continue };
                let dir = target.path(point).display().to_string();
                target.run(Cmd::new("mkdir").args(["-p", &dir]))?;
                target.run(Cmd::new("mount").args([
                    "-o",
                    &format!("subvol={}", name),
                    &layout.root,
                    &dir,
                ]))?;
            }
        }
    }

    // 2. EFI system partition
    if let Some(ref esp) = layout.esp {
        let dir = target.path(state.bootloader().esp_mount_point()).display().to_string();
        target.run(Cmd::new("mkdir").args(["-p", &dir]))?;
        target.run(Cmd::new("mount").args([esp, &dir]))?;
    }

    // 3. Swap
    if let Some(ref swap) = layout.swap {
        target.run(Cmd::new("swapon").arg(swap))?;
    }
    add_swapfile(target, state, Some(fs));

    info!(root = %layout.root, "target mounted at {}", mnt);
    Ok(())
}

/// Creates and activates the swap file so `genfstab` picks it up.
fn add_swapfile(target: &mut Target<'_>, state: &InstallConfig, fs: Option<Filesystem>) {
    if state.swap != SwapKind::File || state.swap_size == 0 {
        return;
    }
    let size = state.swap_size;

    target.best_effort("swap file", |t| {
        let path = t.path(SWAPFILE).display().to_string();
        if fs == Some(Filesystem::Btrfs) {
            t.run(Cmd::new("btrfs").args([
                "filesystem",
                "mkswapfile",
                "--size",
                &format!("{}g", size),
                &path,
            ]))?;
        } else {
            t.run(Cmd::new("fallocate").args(["-l", &format!("{}G", size), &path]))?;
            t.run(Cmd::new("chmod").args(["600", &path]))?;
            t.run(Cmd::new("mkswap").arg(&path))?;
        }
        t.run(Cmd::new("swapon").arg(&path))?;
        Ok(())
    });
}

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::info;

use crate::{
    cmd::Cmd,
    config::InstallConfig,
    error::InstallerError,
    prompt::{Answer, ChoiceItem, Prompt},
    steps::{
        partition::{Filesystem, Layout},
        Target,
    },
};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Bootloader {
    #[default]
    Grub,
    SystemdBoot,
}

impl Bootloader {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn label_key(self) -> &'static str {
        match self {
            Bootloader::Grub => "bootloader_grub",
            Bootloader::SystemdBoot => "bootloader_systemd_boot",
        }
    }

    /// Where the EFI system partition is mounted inside the target.
    pub fn esp_mount_point(self) -> &'static str {
        match self {
            Bootloader::Grub => "/boot/efi",
            Bootloader::SystemdBoot => "/boot",
        }
    }
}

/// BIOS gets GRUB without a question; on UEFI cancelling also means GRUB.
pub fn select(prompt: &mut dyn Prompt, state: &InstallConfig) -> Result<Bootloader, InstallerError> {
    if !state.is_uefi() {
        info!("BIOS firmware, using GRUB");
        return Ok(Bootloader::Grub);
    }

    let items: Vec<ChoiceItem> = Bootloader::iter()
        .map(|b| ChoiceItem::new(b.tag(), b.label_key(), b == state.bootloader()))
        .collect();
    let bootloader = match prompt.single_choice("select_bootloader", &items)? {
        Answer::Given(tag) => tag.parse().unwrap_or_default(),
        Answer::Cancelled => Bootloader::Grub,
    };
    info!("bootloader selected: {}", bootloader.tag());
    Ok(bootloader)
}

// ── Apply ─────────────────────────────────────────────────────────────────────

pub fn apply(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    match state.bootloader() {
        Bootloader::Grub => install_grub(target, state),
        Bootloader::SystemdBoot => install_systemd_boot(target, state),
    }
}

fn install_grub(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    let disk = state.disk.as_deref().ok_or(InstallerError::Incomplete("disk"))?;

    if state.is_uefi() {
        target.run(target.pacman_install(&["grub", "efibootmgr"]))?;
        target.run(target.chroot(
            "grub-install",
            [
                "--target=x86_64-efi",
                "--efi-directory=/boot/efi",
                "--bootloader-id=GRUB",
            ],
        ))?;
    } else {
        target.run(target.pacman_install(&["grub"]))?;
        target.run(target.chroot("grub-install", ["--target=i386-pc", disk]))?;
    }
    target.run(target.chroot("grub-mkconfig", ["-o", "/boot/grub/grub.cfg"]))?;

    info!("GRUB installed ({})", if state.is_uefi() { "UEFI" } else { "BIOS" });
    Ok(())
}

fn install_systemd_boot(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    target.run(target.chroot("bootctl", ["--esp-path=/boot", "install"]))?;

    let kernel = state.kernel.package_name();
    let mut options = root_option(target, state)?;
    if state.partition_scheme.and_then(|s| s.filesystem()) == Some(Filesystem::Btrfs) {
        options.push_str(" rootflags=subvol=@");
    }
    options.push_str(" rw");

    target.write(
        "/boot/loader/entries/arch.conf",
        &format!(
            "title   Arch Linux\n\
             linux   /vmlinuz-{kernel}\n\
             initrd  /initramfs-{kernel}.img\n\
             options {options}\n"
        ),
    )?;
    target.write(
        "/boot/loader/loader.conf",
        "default arch.conf\ntimeout 5\nconsole-mode auto\neditor no\n",
    )?;

    info!(kernel, "systemd-boot installed");
    Ok(())
}

/// `root=UUID=…` of the mounted root, or the device path when the
/// UUID cannot be read.
fn root_option(target: &mut Target<'_>, state: &InstallConfig) -> Result<String, InstallerError> {
    let mnt = target.root_str();
    let out = target.try_run(Cmd::new("findmnt").args(["-no", "UUID", mnt.as_str()]).probe())?;
    let uuid = out.stdout.trim();
    if out.success() && !uuid.is_empty() {
        return Ok(format!("root=UUID={}", uuid));
    }

    let device = Layout::plan(state)?.root;
    target.warn(format!(
        "could not read the root filesystem UUID, booting from {}",
        device
    ));
    Ok(format!("root={}", device))
}

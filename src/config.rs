use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{
    labels::Language,
    steps::{
        bootloader::Bootloader,
        desktop::DesktopEnvironment,
        graphics::GpuDriver,
        locale::KeyboardSwitch,
        network::NetworkManager,
        packages::{AurHelper, Profile},
        partition::{PartitionScheme, SwapKind},
    },
};

pub const DEFAULT_GROUPS: [&str; 5] = ["wheel", "audio", "video", "storage", "optical"];
pub const DEFAULT_LOCALE: &str = "en_US.UTF-8";
pub const DEFAULT_SWAP_GB: u32 = 2;

/// Every operator decision for the current run.
///
/// One instance per process. The menu and the stage modules write it; the
/// installation pipeline only reads it, apart from the two status flags.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallConfig {
    pub language: Language,

    // Target disk
    pub disk: Option<String>,
    pub partition_scheme: Option<PartitionScheme>,
    pub swap: SwapKind,
    pub swap_size: u32,
    is_uefi: bool,
    bootloader: Bootloader,

    // Graphics
    pub gpu_vendor: String,
    pub gpu_model: String,
    pub gpu_driver: Option<GpuDriver>,

    pub desktop_environment: Option<DesktopEnvironment>,

    // Localization
    pub keyboard_layouts: Vec<String>,
    pub keyboard_switch: KeyboardSwitch,
    pub timezone: String,
    pub locale: Vec<String>,

    // Network
    pub hostname: String,
    pub network_manager: NetworkManager,

    // Accounts
    pub root_password: Option<Secret>,
    pub username: Option<String>,
    pub user_password: Option<Secret>,
    pub user_groups: Vec<String>,

    // Extras
    pub installation_profile: Profile,
    pub kernel: KernelVariant,
    pub multilib: bool,
    pub aur_helper: Option<AurHelper>,
    pub additional_packages: Vec<String>,
    pub use_reflector: bool,

    started: bool,
    completed: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            disk: None,
            partition_scheme: None,
            swap: SwapKind::default(),
            swap_size: DEFAULT_SWAP_GB,
            is_uefi: false,
            bootloader: Bootloader::Grub,
            gpu_vendor: "Unknown".to_string(),
            gpu_model: "Unknown".to_string(),
            gpu_driver: None,
            desktop_environment: None,
            keyboard_layouts: vec!["us".to_string()],
            keyboard_switch: KeyboardSwitch::default(),
            timezone: "UTC".to_string(),
            locale: vec![DEFAULT_LOCALE.to_string()],
            hostname: "archlinux".to_string(),
            network_manager: NetworkManager::default(),
            root_password: None,
            username: None,
            user_password: None,
            user_groups: DEFAULT_GROUPS.iter().map(|g| g.to_string()).collect(),
            installation_profile: Profile::default(),
            kernel: KernelVariant::default(),
            multilib: false,
            aur_helper: None,
            additional_packages: Vec::new(),
            use_reflector: true,
            started: false,
            completed: false,
        }
    }
}

impl InstallConfig {
    // ── Firmware / bootloader invariant ───────────────────────────────────────

    pub fn is_uefi(&self) -> bool {
        self.is_uefi
    }

    /// Records the firmware probe result. BIOS forces GRUB.
    pub fn set_uefi(&mut self, is_uefi: bool) {
        self.is_uefi = is_uefi;
        if !is_uefi {
            self.bootloader = Bootloader::Grub;
        }
    }

    pub fn bootloader(&self) -> Bootloader {
        self.bootloader
    }

    /// Stores the bootloader choice; anything but GRUB is refused on BIOS.
    pub fn set_bootloader(&mut self, bootloader: Bootloader) {
        self.bootloader = if self.is_uefi { bootloader } else { Bootloader::Grub };
    }

    // ── Derived values ────────────────────────────────────────────────────────

    /// Display manager service implied by the desktop choice.
    pub fn display_manager(&self) -> Option<&'static str> {
        self.desktop_environment.and_then(|de| de.spec().display_manager)
    }

    /// Groups for the primary user; an empty selection means the defaults.
    pub fn effective_groups(&self) -> Vec<String> {
        if self.user_groups.is_empty() {
            DEFAULT_GROUPS.iter().map(|g| g.to_string()).collect()
        } else {
            self.user_groups.clone()
        }
    }

    pub fn primary_locale(&self) -> &str {
        self.locale.first().map(String::as_str).unwrap_or(DEFAULT_LOCALE)
    }

    /// Label keys of the mandatory values that are still unset.
    pub fn missing_for_install(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.disk.is_none() {
            missing.push("disk");
        }
        if self.partition_scheme.is_none() {
            missing.push("partitioning");
        }
        if self.root_password.is_none() {
            missing.push("root_password");
        }
        if self.username.is_some() && self.user_password.is_none() {
            missing.push("user_password");
        }
        missing
    }

    // ── Status flags ──────────────────────────────────────────────────────────

    pub fn installation_started(&self) -> bool {
        self.started
    }

    pub fn installation_completed(&self) -> bool {
        self.completed
    }

    /// Flips `installation_started`. Returns `false` if it was already set.
    pub(crate) fn mark_started(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }
}

/// A password held in memory. Never printed, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Which Linux kernel variant to install.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum KernelVariant {
    #[default]
    Stable,
    Lts,
    Zen,
}

impl KernelVariant {
    /// The package name for this variant.
    pub fn package_name(self) -> &'static str {
        match self {
            KernelVariant::Stable => "linux",
            KernelVariant::Lts => "linux-lts",
            KernelVariant::Zen => "linux-zen",
        }
    }

    pub fn label_key(self) -> &'static str {
        match self {
            KernelVariant::Stable => "kernel_stable",
            KernelVariant::Lts => "kernel_lts",
            KernelVariant::Zen => "kernel_zen",
        }
    }
}

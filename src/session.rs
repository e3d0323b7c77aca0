use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::Local;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::{
    config::{InstallConfig, KernelVariant},
    error::InstallerError,
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
    validate::validate_hostname,
};

pub const DEFAULT_CONFIG_FILE: &str = "/tmp/arch_install_config.json";

// ── On-disk snapshot ──────────────────────────────────────────────────────────

/// Everything in [`InstallConfig`] except the passwords and the status flags.
#[derive(Serialize)]
struct Snapshot<'a> {
    language: Language,
    disk: Option<&'a str>,
    partition_scheme: Option<PartitionScheme>,
    is_uefi: bool,
    bootloader: Bootloader,
    swap: SwapKind,
    swap_size: u32,
    gpu_vendor: &'a str,
    gpu_model: &'a str,
    gpu_driver: Option<GpuDriver>,
    desktop_environment: Option<DesktopEnvironment>,
    /// Derived; written for readers of the file, ignored on load.
    display_manager: Option<&'static str>,
    keyboard_layouts: &'a [String],
    keyboard_switch: KeyboardSwitch,
    timezone: &'a str,
    locale: &'a [String],
    hostname: &'a str,
    network_manager: NetworkManager,
    username: Option<&'a str>,
    user_groups: &'a [String],
    installation_profile: Profile,
    kernel: KernelVariant,
    multilib: bool,
    aur_helper: Option<AurHelper>,
    additional_packages: &'a [String],
    use_reflector: bool,
    timestamp: String,
}

impl<'a> Snapshot<'a> {
    fn of(state: &'a InstallConfig) -> Self {
        Self {
            language: state.language,
            disk: state.disk.as_deref(),
            partition_scheme: state.partition_scheme,
            is_uefi: state.is_uefi(),
            bootloader: state.bootloader(),
            swap: state.swap,
            swap_size: state.swap_size,
            gpu_vendor: &state.gpu_vendor,
            gpu_model: &state.gpu_model,
            gpu_driver: state.gpu_driver,
            desktop_environment: state.desktop_environment,
            display_manager: state.display_manager(),
            keyboard_layouts: &state.keyboard_layouts,
            keyboard_switch: state.keyboard_switch,
            timezone: &state.timezone,
            locale: &state.locale,
            hostname: &state.hostname,
            network_manager: state.network_manager,
            username: state.username.as_deref(),
            user_groups: &state.user_groups,
            installation_profile: state.installation_profile,
            kernel: state.kernel,
            multilib: state.multilib,
            aur_helper: state.aur_helper,
            additional_packages: &state.additional_packages,
            use_reflector: state.use_reflector,
            timestamp: Local::now().to_rfc3339(),
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Save/load of the configuration as a flat JSON object.
///
/// There is no schema version: a missing or malformed key simply takes its
/// default, so partially written or older files still load.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_FILE)
    }
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Writes the snapshot. I/O errors are logged, never raised: the
    /// operator can simply try again.
    pub fn save(&self, state: &InstallConfig) -> bool {
        match self.write(state) {
            Ok(()) => {
                info!(path = %self.path.display(), "configuration saved");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), "could not save configuration: {}", e);
                false
            }
        }
    }

    fn write(&self, state: &InstallConfig) -> Result<(), InstallerError> {
        let json = serde_json::to_string_pretty(&Snapshot::of(state))?;
        fs::write(&self.path, json + "\n")?;
        Ok(())
    }

    /// Reads the file back. A missing or unreadable file yields the defaults.
    pub fn load(&self) -> InstallConfig {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no saved configuration, using defaults");
                return InstallConfig::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "could not read configuration: {}", e);
                return InstallConfig::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => {
                info!(path = %self.path.display(), "configuration loaded");
                from_map(&map)
            }
            Ok(_) | Err(_) => {
                warn!(path = %self.path.display(), "configuration file is not a JSON object, using defaults");
                InstallConfig::default()
            }
        }
    }
}

/// `map[key]` as `T`, or `None` when absent or of the wrong shape.
fn field<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    let value = map.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(key, "ignoring malformed value: {}", e);
            None
        }
    }
}

fn non_empty(list: Option<Vec<String>>) -> Option<Vec<String>> {
    list.filter(|l| !l.is_empty())
}

fn from_map(map: &Map<String, Value>) -> InstallConfig {
    let mut s = InstallConfig::default();

    if let Some(v) = field(map, "language") {
        s.language = v;
    }
    if let Some(v) = field::<Option<String>>(map, "disk") {
        s.disk = v;
    }
    if let Some(v) = field(map, "partition_scheme") {
        s.partition_scheme = v;
    }
    if let Some(v) = field(map, "is_uefi") {
        s.set_uefi(v);
    }
    if let Some(v) = field(map, "bootloader") {
        s.set_bootloader(v);
    }
    if let Some(v) = field(map, "swap") {
        s.swap = v;
    }
    if let Some(v) = field(map, "swap_size") {
        s.swap_size = v;
    }
    if let Some(v) = field(map, "gpu_vendor") {
        s.gpu_vendor = v;
    }
    if let Some(v) = field(map, "gpu_model") {
        s.gpu_model = v;
    }
    if let Some(v) = field(map, "gpu_driver") {
        s.gpu_driver = v;
    }
    if let Some(v) = field(map, "desktop_environment") {
        s.desktop_environment = v;
    }
    if let Some(v) = non_empty(field(map, "keyboard_layouts")) {
        s.keyboard_layouts = v;
    }
    if let Some(v) = field(map, "keyboard_switch") {
        s.keyboard_switch = v;
    }
    if let Some(v) = field(map, "timezone") {
        s.timezone = v;
    }
    if let Some(v) = non_empty(field(map, "locale")) {
        s.locale = v;
    }
    if let Some(v) = field::<String>(map, "hostname").filter(|h| validate_hostname(h)) {
        s.hostname = v;
    }
    if let Some(v) = field(map, "network_manager") {
        s.network_manager = v;
    }
    if let Some(v) = field(map, "username") {
        s.username = v;
    }
    if let Some(v) = field(map, "user_groups") {
        s.user_groups = v;
    }
    if let Some(v) = field(map, "installation_profile") {
        s.installation_profile = v;
    }
    if let Some(v) = field(map, "kernel") {
        s.kernel = v;
    }
    if let Some(v) = field(map, "multilib") {
        s.multilib = v;
    }
    if let Some(v) = field(map, "aur_helper") {
        s.aur_helper = v;
    }
    if let Some(v) = field(map, "additional_packages") {
        s.additional_packages = v;
    }
    if let Some(v) = field(map, "use_reflector") {
        s.use_reflector = v;
    }
    s
}

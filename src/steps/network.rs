use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::info;

use crate::{
    error::InstallerError,
    prompt::{Answer, ChoiceItem, Prompt, Selection},
    steps::Target,
    validate::validate_hostname,
};

const WIRED_PROFILE: &str = "/etc/systemd/network/20-wired.network";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NetworkManager {
    #[default]
    Networkmanager,
    SystemdNetworkd,
    Iwd,
}

impl NetworkManager {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn packages(self) -> &'static [&'static str] {
        match self {
            NetworkManager::Networkmanager => &["networkmanager"],
            NetworkManager::SystemdNetworkd => &[],
            NetworkManager::Iwd => &["iwd"],
        }
    }

    /// systemd unit to enable.
    pub fn service(self) -> &'static str {
        match self {
            NetworkManager::Networkmanager => "NetworkManager",
            NetworkManager::SystemdNetworkd => "systemd-networkd",
            NetworkManager::Iwd => "iwd",
        }
    }

    /// Managers that leave DNS to `systemd-resolved`.
    fn needs_resolved(self) -> bool {
        !matches!(self, NetworkManager::Networkmanager)
    }
}

/// Re-prompts until the hostname is valid. Cancelling aborts the stage.
pub fn select_hostname(prompt: &mut dyn Prompt, current: &str) -> Selection<String> {
    loop {
        let Answer::Given(input) = prompt.text("hostname", current)? else {
            return Ok(Answer::Cancelled);
        };
        let hostname = input.trim();
        if hostname.is_empty() {
            prompt.message("error_empty_hostname")?;
        } else if !validate_hostname(hostname) {
            prompt.message("error_invalid_hostname")?;
        } else {
            info!("hostname configured: {}", hostname);
            return Ok(Answer::Given(hostname.to_string()));
        }
    }
}

/// Cancelling picks NetworkManager.
pub fn select_manager(
    prompt: &mut dyn Prompt,
    current: NetworkManager,
) -> Result<NetworkManager, InstallerError> {
    let items: Vec<ChoiceItem> = NetworkManager::iter()
        .map(|nm| ChoiceItem::new(nm.tag(), nm.tag(), nm == current))
        .collect();
    let nm = match prompt.single_choice("select_network_manager", &items)? {
        Answer::Given(tag) => tag.parse().unwrap_or_default(),
        Answer::Cancelled => NetworkManager::default(),
    };
    info!("network manager selected: {}", nm.tag());
    Ok(nm)
}

// ── Apply ─────────────────────────────────────────────────────────────────────

pub fn apply_hostname(target: &mut Target<'_>, hostname: &str) -> Result<(), InstallerError> {
    target.write("/etc/hostname", &format!("{}\n", hostname))?;
    target.write(
        "/etc/hosts",
        &format!(
            "127.0.0.1   localhost\n\
             ::1         localhost\n\
             127.0.1.1   {host}.localdomain {host}\n",
            host = hostname
        ),
    )?;
    info!("hostname set to {}", hostname);
    Ok(())
}

/// Installs and enables the network manager.
pub fn apply_services(target: &mut Target<'_>, nm: NetworkManager) -> Result<(), InstallerError> {
    if !nm.packages().is_empty() {
        target.run(target.pacman_install(nm.packages()))?;
    }
    if nm == NetworkManager::SystemdNetworkd {
        target.write(
            WIRED_PROFILE,
            "[Match]\nName=en*\nName=eth*\n\n[Network]\nDHCP=yes\n",
        )?;
    }
    target.run(target.chroot("systemctl", ["enable", nm.service()]))?;
    if nm.needs_resolved() {
        target.run(target.chroot("systemctl", ["enable", "systemd-resolved"]))?;
    }
    info!("network manager {} enabled", nm.tag());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cancel_choice, cancel_text, pick, text, FakeRunner, ScriptedPrompt};

    #[test]
    fn hostname_loop_rejects_until_valid() {
        let mut prompt = ScriptedPrompt::new(vec![text(""), text("-bad"), text("arch-01")]);
        let host = select_hostname(&mut prompt, "archlinux").unwrap().given();
        assert_eq!(host.as_deref(), Some("arch-01"));
        assert_eq!(prompt.messages, vec!["error_empty_hostname", "error_invalid_hostname"]);
    }

    #[test]
    fn hostname_cancel_aborts() {
        let mut prompt = ScriptedPrompt::new(vec![text("-bad"), cancel_text()]);
        assert!(select_hostname(&mut prompt, "archlinux").unwrap().is_cancelled());
    }

    #[test]
    fn manager_cancel_defaults_to_networkmanager() {
        let mut prompt = ScriptedPrompt::new(vec![cancel_choice()]);
        assert_eq!(
            select_manager(&mut prompt, NetworkManager::Iwd).unwrap(),
            NetworkManager::Networkmanager
        );

        let mut prompt = ScriptedPrompt::new(vec![pick("iwd")]);
        assert_eq!(
            select_manager(&mut prompt, NetworkManager::default()).unwrap(),
            NetworkManager::Iwd
        );
    }

    #[test]
    fn hosts_file_maps_hostname() {
        let mut runner = FakeRunner::default();
        apply_hostname(&mut Target::new(&mut runner, "/mnt"), "box").unwrap();
        assert_eq!(runner.file("/mnt/etc/hostname"), Some("box\n"));
        assert!(runner.file("/mnt/etc/hosts").unwrap().contains("127.0.1.1   box.localdomain box"));
    }

    #[test]
    fn networkd_gets_dhcp_profile_and_resolved() {
        let mut runner = FakeRunner::default();
        apply_services(&mut Target::new(&mut runner, "/mnt"), NetworkManager::SystemdNetworkd)
            .unwrap();
        assert_eq!(
            runner.log,
            vec![
                "write /mnt/etc/systemd/network/20-wired.network",
                "arch-chroot /mnt systemctl enable systemd-networkd",
                "arch-chroot /mnt systemctl enable systemd-resolved",
            ]
        );
    }

    #[test]
    fn networkmanager_installs_and_enables() {
        let mut runner = FakeRunner::default();
        apply_services(&mut Target::new(&mut runner, "/mnt"), NetworkManager::Networkmanager)
            .unwrap();
        assert_eq!(
            runner.log,
            vec![
                "arch-chroot /mnt pacman -S --needed --noconfirm networkmanager",
                "arch-chroot /mnt systemctl enable NetworkManager",
            ]
        );
    }
}

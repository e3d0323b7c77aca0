use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::info;

use crate::{
    error::InstallerError,
    prompt::{ChoiceItem, Prompt, Selection},
    steps::Target,
};

const WAYLAND_ESSENTIALS: [&str; 3] = ["wayland", "xorg-xwayland", "libxcb"];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DesktopEnvironment {
    Kde,
    Gnome,
    Xfce,
    Cinnamon,
    Mate,
    I3,
    Sway,
    /// Console only.
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    NoDesktop,
}

#[derive(Debug, Clone, Copy)]
pub struct DesktopSpec {
    pub packages: &'static [&'static str],
    pub display_manager: Option<&'static str>,
    /// Pure Wayland compositor: needs the Wayland runtime on top.
    pub wayland: bool,
    pub ram: &'static str,
    pub disk: &'static str,
}

impl DesktopEnvironment {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn label_key(self) -> &'static str {
        match self {
            DesktopEnvironment::Kde => "de_kde",
            DesktopEnvironment::Gnome => "de_gnome",
            DesktopEnvironment::Xfce => "de_xfce",
            DesktopEnvironment::Cinnamon => "de_cinnamon",
            DesktopEnvironment::Mate => "de_mate",
            DesktopEnvironment::I3 => "de_i3",
            DesktopEnvironment::Sway => "de_sway",
            DesktopEnvironment::NoDesktop => "de_none",
        }
    }

    pub fn spec(self) -> DesktopSpec {
        use DesktopEnvironment::*;
        let (packages, display_manager, wayland, ram, disk): (&'static [&'static str], _, _, _, _) =
            match self {
                Kde => (
                    &["plasma-meta", "kde-applications-meta", "sddm", "sddm-kcm"],
                    Some("sddm"),
                    false,
                    "2GB",
                    "8GB",
                ),
                Gnome => (&["gnome", "gnome-extra", "gdm"], Some("gdm"), false, "2GB", "8GB"),
                Xfce => (
                    &["xfce4", "xfce4-goodies", "lightdm", "lightdm-gtk-greeter"],
                    Some("lightdm"),
                    false,
                    "512MB",
                    "3GB",
                ),
                Cinnamon => (
                    &["cinnamon", "lightdm", "lightdm-gtk-greeter"],
                    Some("lightdm"),
                    false,
                    "2GB",
                    "5GB",
                ),
                Mate => (&["mate", "mate-extra", "lightdm"], Some("lightdm"), false, "1GB", "4GB"),
                I3 => (
                    &["i3-wm", "i3status", "i3lock", "dmenu", "lightdm", "lightdm-gtk-greeter"],
                    Some("lightdm"),
                    false,
                    "256MB",
                    "1GB",
                ),
                Sway => (
                    &["sway", "swaylock", "swayidle", "waybar", "wofi", "foot"],
                    None,
                    true,
                    "512MB",
                    "2GB",
                ),
                NoDesktop => (&[], None, false, "128MB", "500MB"),
            };
        DesktopSpec {
            packages,
            display_manager,
            wayland,
            ram,
            disk,
        }
    }
}

pub fn select(
    prompt: &mut dyn Prompt,
    current: Option<DesktopEnvironment>,
) -> Selection<DesktopEnvironment> {
    let items: Vec<ChoiceItem> = DesktopEnvironment::iter()
        .map(|de| {
            let spec = de.spec();
            ChoiceItem::new(
                de.tag(),
                format!("{} ({} RAM, {} disk)", de.label_key(), spec.ram, spec.disk),
                Some(de) == current,
            )
        })
        .collect();

    let answer = prompt
        .single_choice("select_desktop", &items)?
        .map(|tag| tag.parse().unwrap_or(DesktopEnvironment::NoDesktop));
    if let Some(de) = answer.clone().given() {
        info!("desktop environment selected: {}", de.tag());
    }
    Ok(answer)
}

/// Installs the environment's packages and enables its display manager.
pub fn apply(target: &mut Target<'_>, de: DesktopEnvironment) -> Result<(), InstallerError> {
    let spec = de.spec();
    if spec.packages.is_empty() {
        info!("no desktop environment, console only");
        return Ok(());
    }

    target.run(target.pacman_install(spec.packages))?;
    if spec.wayland {
        target.run(target.pacman_install(&WAYLAND_ESSENTIALS))?;
    }
    if let Some(dm) = spec.display_manager {
        target.run(target.chroot("systemctl", ["enable", dm]))?;
    }

    info!("desktop environment '{}' installed", de.tag());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cancel_choice, pick, FakeRunner, ScriptedPrompt};

    #[test]
    fn tags_round_trip_through_strum() {
        for de in DesktopEnvironment::iter() {
            assert_eq!(de.tag().parse::<DesktopEnvironment>().unwrap(), de);
        }
        assert_eq!(DesktopEnvironment::NoDesktop.tag(), "none");
        assert_eq!(DesktopEnvironment::I3.tag(), "i3");
    }

    #[test]
    fn labels_carry_resource_hints() {
        let mut prompt = ScriptedPrompt::new(vec![pick("xfce")]);
        select(&mut prompt, None).unwrap();
        let (_, items) = &prompt.offered[0];
        assert_eq!(items[2].label, "de_xfce (512MB RAM, 3GB disk)");
    }

    #[test]
    fn cancel_returns_cancelled() {
        let mut prompt = ScriptedPrompt::new(vec![cancel_choice()]);
        assert!(select(&mut prompt, Some(DesktopEnvironment::Kde))
            .unwrap()
            .is_cancelled());
    }

    #[test]
    fn gnome_enables_gdm() {
        let mut runner = FakeRunner::default();
        apply(&mut Target::new(&mut runner, "/mnt"), DesktopEnvironment::Gnome).unwrap();
        assert_eq!(
            runner.log,
            vec![
                "arch-chroot /mnt pacman -S --needed --noconfirm gnome gnome-extra gdm",
                "arch-chroot /mnt systemctl enable gdm",
            ]
        );
    }

    #[test]
    fn sway_pulls_wayland_and_no_display_manager() {
        let mut runner = FakeRunner::default();
        apply(&mut Target::new(&mut runner, "/mnt"), DesktopEnvironment::Sway).unwrap();
        assert!(runner.ran("xorg-xwayland"));
        assert!(!runner.ran("systemctl enable"));
    }

    #[test]
    fn no_desktop_runs_nothing() {
        let mut runner = FakeRunner::default();
        apply(&mut Target::new(&mut runner, "/mnt"), DesktopEnvironment::NoDesktop).unwrap();
        assert!(runner.log.is_empty());
    }
}

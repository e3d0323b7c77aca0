use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::info;

use crate::{
    cmd::Cmd,
    config::{InstallConfig, KernelVariant},
    error::InstallerError,
    prompt::{Answer, ChoiceItem, Prompt, Selection},
    steps::Target,
};

// ── Profiles ──────────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Profile {
    #[default]
    Desktop,
    Minimal,
    Server,
    Xorg,
}

/// The three package tiers of a profile, installed as one list.
#[derive(Debug, Clone, Copy)]
pub struct ProfileSpec {
    pub base: &'static [&'static str],
    pub essential: &'static [&'static str],
    pub extra: &'static [&'static str],
}

impl Profile {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn label_key(self) -> &'static str {
        match self {
            Profile::Desktop => "profile_desktop",
            Profile::Minimal => "profile_minimal",
            Profile::Server => "profile_server",
            Profile::Xorg => "profile_xorg",
        }
    }

    pub fn spec(self) -> ProfileSpec {
        match self {
            Profile::Desktop => ProfileSpec {
                base: &["base", "base-devel", "linux", "linux-firmware"],
                essential: &[
                    "networkmanager", "wireless_tools", "wpa_supplicant", "dialog", "sudo", "git",
                    "reflector",
                ],
                extra: &[
                    "firefox", "file-roller", "pulseaudio", "alsa-utils", "xdg-user-dirs",
                    "ttf-dejavu", "noto-fonts", "vim",
                ],
            },
            Profile::Minimal => ProfileSpec {
                base: &["base", "linux", "linux-firmware"],
                essential: &["networkmanager", "sudo", "nano"],
                extra: &[],
            },
            Profile::Server => ProfileSpec {
                base: &["base", "linux", "linux-firmware"],
                essential: &["networkmanager", "openssh", "sudo", "htop", "tmux"],
                extra: &["curl", "wget", "git"],
            },
            Profile::Xorg => ProfileSpec {
                base: &["base", "base-devel", "linux", "linux-firmware"],
                essential: &["xorg-server", "xorg-xinit", "networkmanager", "sudo"],
                extra: &["xterm", "firefox", "vim"],
            },
        }
    }

    /// base + essential + extra, with `linux` swapped for the chosen kernel.
    pub fn packages(self, kernel: KernelVariant) -> Vec<String> {
        let spec = self.spec();
        spec.base
            .iter()
            .chain(spec.essential)
            .chain(spec.extra)
            .map(|&p| if p == "linux" { kernel.package_name() } else { p })
            .map(str::to_string)
            .collect()
    }
}

// ── Additional package catalog ────────────────────────────────────────────────

pub type Category = (&'static str, &'static [(&'static str, &'static str)]);

pub const CATALOG: &[Category] = &[
    ("browsers", &[
        ("firefox", "Firefox"),
        ("chromium", "Chromium"),
        ("brave", "Brave"),
        ("midori", "Midori"),
    ]),
    ("development", &[
        ("base-devel", "Build tools (gcc, make, etc.)"),
        ("code", "Visual Studio Code"),
        ("python", "Python"),
        ("python-pip", "Python package manager"),
        ("nodejs", "Node.js"),
        ("npm", "Node package manager"),
        ("git", "Git version control"),
        ("docker", "Docker"),
        ("docker-compose", "Docker Compose"),
    ]),
    ("multimedia", &[
        ("vlc", "VLC media player"),
        ("gimp", "GIMP image editor"),
        ("inkscape", "Inkscape vector graphics"),
        ("obs-studio", "OBS Studio (streaming)"),
        ("audacity", "Audacity audio editor"),
        ("blender", "Blender 3D graphics"),
    ]),
    ("utilities", &[
        ("git", "Git"),
        ("vim", "Vim text editor"),
        ("neovim", "Neovim"),
        ("htop", "System monitor"),
        ("tmux", "Terminal multiplexer"),
        ("rsync", "File synchronization"),
        ("curl", "cURL"),
        ("wget", "Wget"),
        ("unzip", "Unzip utility"),
        ("p7zip", "7-Zip utility"),
        ("openssh", "SSH client/server"),
    ]),
    ("documents", &[
        ("libreoffice-fresh", "LibreOffice"),
        ("thunderbird", "Email client"),
        ("evince", "Document viewer"),
    ]),
    ("system", &[
        ("man-db", "Manual pages"),
        ("man-pages", "Manual page content"),
        ("pacman-contrib", "Pacman utilities"),
        ("powertop", "Power consumption monitor"),
        ("nvtop", "GPU monitor"),
    ]),
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AurHelper {
    Yay,
    Paru,
}

impl AurHelper {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    /// Prebuilt AUR package for the helper.
    pub fn aur_package(self) -> &'static str {
        match self {
            AurHelper::Yay => "yay-bin",
            AurHelper::Paru => "paru-bin",
        }
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

pub fn select_profile(prompt: &mut dyn Prompt, current: Profile) -> Selection<Profile> {
    let items: Vec<ChoiceItem> = Profile::iter()
        .map(|p| ChoiceItem::new(p.tag(), p.label_key(), p == current))
        .collect();
    Ok(prompt
        .single_choice("select_profile", &items)?
        .map(|tag| tag.parse().unwrap_or_default()))
}

pub fn select_kernel(prompt: &mut dyn Prompt, current: KernelVariant) -> Selection<KernelVariant> {
    let items: Vec<ChoiceItem> = KernelVariant::iter()
        .map(|k| {
            let tag: &'static str = k.into();
            ChoiceItem::new(tag, k.label_key(), k == current)
        })
        .collect();
    Ok(prompt
        .single_choice("select_kernel", &items)?
        .map(|tag| tag.parse().unwrap_or_default()))
}

/// One checklist per catalog category; the picks accumulate into one flat,
/// duplicate-free list. Cancelling a category keeps its previous picks.
pub fn select_additional(prompt: &mut dyn Prompt, current: &[String]) -> Selection<Vec<String>> {
    let mut selected: Vec<String> = Vec::new();

    for (category, packages) in CATALOG {
        let is_current = |pkg: &str| current.iter().any(|c| c == pkg);
        let items: Vec<ChoiceItem> = packages
            .iter()
            .map(|(pkg, label)| ChoiceItem::new(*pkg, format!("{:<18} {}", pkg, label), is_current(pkg)))
            .collect();

        let picks = match prompt.multi_choice(&format!("packages_{}", category), &items)? {
            Answer::Given(tags) => tags,
            Answer::Cancelled => packages
                .iter()
                .filter(|(pkg, _)| is_current(pkg))
                .map(|(pkg, _)| pkg.to_string())
                .collect(),
        };

        for pkg in picks {
            if !selected.contains(&pkg) {
                selected.push(pkg);
            }
        }
    }

    // Picks outside the catalog (from a loaded file) survive.
    for pkg in current {
        let in_catalog = CATALOG.iter().any(|(_, pkgs)| pkgs.iter().any(|(p, _)| p == pkg));
        if !in_catalog && !selected.contains(pkg) {
            selected.push(pkg.clone());
        }
    }

    info!(packages = ?selected, "additional packages selected");
    Ok(Answer::Given(selected))
}

/// `None` stands for "no AUR helper".
pub fn select_aur_helper(
    prompt: &mut dyn Prompt,
    current: Option<AurHelper>,
) -> Selection<Option<AurHelper>> {
    let mut items: Vec<ChoiceItem> = AurHelper::iter()
        .map(|h| ChoiceItem::new(h.tag(), h.tag(), Some(h) == current))
        .collect();
    items.push(ChoiceItem::new("none", "no_aur", current.is_none()));

    Ok(prompt
        .single_choice("enable_aur", &items)?
        .map(|tag| tag.parse().ok()))
}

// ── Apply ─────────────────────────────────────────────────────────────────────

/// Ranks mirrors on the live system; `pacstrap` copies the list over.
pub fn update_mirrors(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    if !state.use_reflector {
        info!("mirror ranking disabled, keeping the current mirrorlist");
        return Ok(());
    }
    target.run(Cmd::new("reflector").args([
        "--latest",
        "20",
        "--sort",
        "rate",
        "--save",
        "/etc/pacman.d/mirrorlist",
    ]))?;
    Ok(())
}

/// Installs the base system via `pacstrap`.
pub fn install_base(target: &mut Target<'_>) -> Result<(), InstallerError> {
    let mnt = target.root_str();
    target.run(Cmd::new("pacstrap").args(["-K", &mnt, "base"]))?;
    info!("base system installed");
    Ok(())
}

/// Installs the chosen kernel + `linux-firmware` via `pacstrap`.
pub fn install_kernel(target: &mut Target<'_>, kernel: KernelVariant) -> Result<(), InstallerError> {
    let mnt = target.root_str();
    let pkg = kernel.package_name();
    target.run(Cmd::new("pacstrap").args([mnt.as_str(), pkg, "linux-firmware"]))?;
    info!("kernel '{}' installed", pkg);
    Ok(())
}

/// Profile packages, operator picks, multilib and the AUR helper.
/// The profile/extra package install must succeed; the rest only warns.
pub fn install_extras(target: &mut Target<'_>, state: &InstallConfig) -> Result<(), InstallerError> {
    if state.multilib {
        target.best_effort("multilib", enable_multilib);
    }

    let mut packages = state.installation_profile.packages(state.kernel);
    for pkg in &state.additional_packages {
        if !packages.contains(pkg) {
            packages.push(pkg.clone());
        }
    }
    info!(count = packages.len(), "installing packages");
    target.run(target.pacman_install(&packages))?;

    if let Some(helper) = state.aur_helper {
        match state.username.as_deref() {
            Some(user) => target.best_effort("AUR helper", |t| install_aur_helper(t, helper, user)),
            None => target.warn(format!(
                "AUR helper {} skipped: it has to be built by a regular user",
                helper.tag()
            )),
        }
    }
    Ok(())
}

fn enable_multilib(target: &mut Target<'_>) -> Result<(), InstallerError> {
    let conf = target.path("/etc/pacman.conf").display().to_string();
    target.run(Cmd::new("sed").args([
        "-i",
        r"/^#\[multilib\]/,/^#Include = \/etc\/pacman.d\/mirrorlist/ s/^#//",
        &conf,
    ]))?;
    target.run(target.chroot("pacman", ["-Sy"]))?;
    Ok(())
}

fn install_aur_helper(
    target: &mut Target<'_>,
    helper: AurHelper,
    user: &str,
) -> Result<(), InstallerError> {
    let pkg = helper.aur_package();
    target.run(target.pacman_install(&["git", "base-devel"]))?;

    // makepkg refuses to run as root: build as the user, install as root.
    let script = format!(
        "install -d -o {user} /var/tmp/aur && \
         runuser -u {user} -- bash -c 'cd /var/tmp/aur && rm -rf {pkg} && \
         git clone https://aur.archlinux.org/{pkg}.git && cd {pkg} && makepkg --noconfirm' && \
         pacman -U --noconfirm /var/tmp/aur/{pkg}/*.pkg.tar.zst",
    );
    target.run(target.chroot("bash", ["-c", script.as_str()]))?;
    info!("AUR helper {} installed", helper.tag());
    Ok(())
}

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::{debug, info};

use crate::{
    cmd::{Cmd, CommandRunner},
    error::InstallerError,
    prompt::{ChoiceItem, Prompt, Selection},
    steps::Target,
};

const PRIME_PROFILE: &str = "/etc/profile.d/nvidia-prime.sh";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GpuDriver {
    NvidiaProprietary,
    NvidiaOpensource,
    Amd,
    Intel,
    Hybrid,
    Generic,
}

/// Packages a driver installs, and the ones that must go first.
#[derive(Debug, Clone, Copy)]
pub struct DriverSpec {
    pub packages: &'static [&'static str],
    pub conflicts: &'static [&'static str],
}

impl GpuDriver {
    pub fn tag(self) -> &'static str {
        self.into()
    }

    pub fn label_key(self) -> &'static str {
        match self {
            GpuDriver::NvidiaProprietary => "driver_nvidia_proprietary",
            GpuDriver::NvidiaOpensource => "driver_nvidia_opensource",
            GpuDriver::Amd => "driver_amd",
            GpuDriver::Intel => "driver_intel",
            GpuDriver::Hybrid => "driver_hybrid",
            GpuDriver::Generic => "driver_generic",
        }
    }

    pub fn spec(self) -> DriverSpec {
        match self {
            GpuDriver::NvidiaProprietary => DriverSpec {
                packages: &["nvidia", "nvidia-utils", "nvidia-settings"],
                conflicts: &["xf86-video-nouveau"],
            },
            GpuDriver::NvidiaOpensource => DriverSpec {
                packages: &["xf86-video-nouveau", "mesa"],
                conflicts: &["nvidia", "nvidia-utils", "nvidia-settings"],
            },
            GpuDriver::Amd => DriverSpec {
                packages: &[
                    "mesa",
                    "xf86-video-amdgpu",
                    "vulkan-radeon",
                    "libva-mesa-driver",
                    "mesa-vdpau",
                ],
                conflicts: &[],
            },
            GpuDriver::Intel => DriverSpec {
                packages: &["mesa", "intel-media-driver", "vulkan-intel"],
                conflicts: &[],
            },
            GpuDriver::Hybrid => DriverSpec {
                packages: &["nvidia", "nvidia-prime", "mesa"],
                conflicts: &["xf86-video-nouveau"],
            },
            GpuDriver::Generic => DriverSpec {
                packages: &["xf86-video-vesa"],
                conflicts: &[],
            },
        }
    }
}

// ── Detection ─────────────────────────────────────────────────────────────────

/// What `lspci` reported about the display controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuInfo {
    pub vendor: String,
    pub model: String,
    pub driver: GpuDriver,
}

impl Default for GpuInfo {
    fn default() -> Self {
        Self {
            vendor: "Unknown".to_string(),
            model: "Unknown".to_string(),
            driver: GpuDriver::Generic,
        }
    }
}

/// Probes the GPU. Falls back to the generic driver when nothing matches
/// or `lspci` is unavailable.
pub fn detect(runner: &mut dyn CommandRunner) -> GpuInfo {
    match runner.run(&Cmd::new("lspci").probe(), false) {
        Ok(out) if out.success() => parse_lspci(&out.stdout),
        Ok(_) | Err(_) => {
            debug!("lspci unavailable, assuming a generic GPU");
            GpuInfo::default()
        }
    }
}

pub fn parse_lspci(stdout: &str) -> GpuInfo {
    for line in stdout.lines().filter(|l| l.contains("VGA") || l.contains("3D")) {
        let model = line
            .rsplit_once(": ")
            .map(|(_, m)| m.trim().to_string())
            .unwrap_or_else(|| line.trim().to_string());

        let (vendor, driver) = if line.contains("NVIDIA") {
            ("NVIDIA", GpuDriver::NvidiaProprietary)
        } else if line.contains("AMD") || line.contains("ATI") {
            ("AMD", GpuDriver::Amd)
        } else if line.contains("Intel") {
            ("Intel", GpuDriver::Intel)
        } else {
            continue;
        };

        info!(vendor, model = %model, "GPU detected");
        return GpuInfo {
            vendor: vendor.to_string(),
            model,
            driver,
        };
    }
    GpuInfo::default()
}

// ── Selection ─────────────────────────────────────────────────────────────────

/// Driver list with `preselect` highlighted.
pub fn select_driver(prompt: &mut dyn Prompt, preselect: GpuDriver) -> Selection<GpuDriver> {
    let items: Vec<ChoiceItem> = GpuDriver::iter()
        .map(|d| ChoiceItem::new(d.tag(), d.label_key(), d == preselect))
        .collect();
    Ok(prompt
        .single_choice("select_driver", &items)?
        .map(|tag| tag.parse().unwrap_or(GpuDriver::Generic)))
}

// ── Apply ─────────────────────────────────────────────────────────────────────

/// Removes conflicting packages, then installs the driver set.
pub fn apply(target: &mut Target<'_>, driver: GpuDriver) -> Result<(), InstallerError> {
    let spec = driver.spec();

    for pkg in spec.conflicts {
        // Not installed is the common case.
        target.try_run(target.chroot("pacman", ["-Rns", "--noconfirm", *pkg]))?;
    }
    target.run(target.pacman_install(spec.packages))?;

    if driver == GpuDriver::Hybrid {
        target.write(
            PRIME_PROFILE,
            "# NVIDIA PRIME render offload\n\
             export __NV_PRIME_RENDER_OFFLOAD=1\n\
             export __GLX_VENDOR_LIBRARY_NAME=nvidia\n",
        )?;
    }

    info!("graphics driver '{}' installed", driver.tag());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pick, FakeRunner, ScriptedPrompt};

    const LSPCI: &str = "\
00:00.0 Host bridge: Intel Corporation Device 4660 (rev 02)
01:00.0 VGA compatible controller: NVIDIA Corporation GA104 [GeForce RTX 3070]
00:1f.3 Audio device: Intel Corporation Device 7ad0";

    #[test]
    fn detects_vendor_from_vga_line() {
        let info = parse_lspci(LSPCI);
        assert_eq!(info.vendor, "NVIDIA");
        assert_eq!(info.model, "NVIDIA Corporation GA104 [GeForce RTX 3070]");
        assert_eq!(info.driver, GpuDriver::NvidiaProprietary);
    }

    #[test]
    fn ati_counts_as_amd() {
        let info = parse_lspci("03:00.0 VGA compatible controller: ATI Radeon HD 5450");
        assert_eq!(info.driver, GpuDriver::Amd);
    }

    #[test]
    fn unknown_vendor_is_generic() {
        let info = parse_lspci("00:02.0 VGA compatible controller: Red Hat, Inc. QXL paravirtual");
        assert_eq!(info, GpuInfo::default());
    }

    #[test]
    fn missing_lspci_is_generic() {
        let mut runner = FakeRunner::default();
        runner.fail_on("lspci");
        assert_eq!(detect(&mut runner).driver, GpuDriver::Generic);
    }

    #[test]
    fn detected_driver_is_preselected() {
        let mut prompt = ScriptedPrompt::new(vec![pick("intel")]);
        let chosen = select_driver(&mut prompt, GpuDriver::Amd).unwrap().given();
        assert_eq!(chosen, Some(GpuDriver::Intel));

        let (_, items) = &prompt.offered[0];
        let on: Vec<&str> = items.iter().filter(|i| i.on).map(|i| i.tag.as_str()).collect();
        assert_eq!(on, vec!["amd"]);
    }

    #[test]
    fn open_source_nvidia_removes_proprietary_first() {
        let mut runner = FakeRunner::default();
        apply(&mut Target::new(&mut runner, "/mnt"), GpuDriver::NvidiaOpensource).unwrap();

        let removal = runner.position("pacman -Rns --noconfirm nvidia").unwrap();
        let install = runner.position("pacman -S --needed --noconfirm xf86-video-nouveau").unwrap();
        assert!(removal < install);
    }

    #[test]
    fn failed_removal_does_not_stop_install() {
        let mut runner = FakeRunner::default();
        runner.fail_on("-Rns");
        apply(&mut Target::new(&mut runner, "/mnt"), GpuDriver::NvidiaProprietary).unwrap();
        assert!(runner.ran("pacman -S --needed --noconfirm nvidia nvidia-utils nvidia-settings"));
    }

    #[test]
    fn hybrid_writes_prime_profile() {
        let mut runner = FakeRunner::default();
        apply(&mut Target::new(&mut runner, "/mnt"), GpuDriver::Hybrid).unwrap();
        assert!(runner
            .file("/mnt/etc/profile.d/nvidia-prime.sh")
            .unwrap()
            .contains("__NV_PRIME_RENDER_OFFLOAD=1"));
    }
}

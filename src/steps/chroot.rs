use std::path::Path;

use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::info;

use crate::{
    cmd::Cmd,
    error::InstallerError,
    prompt::{Answer, Prompt},
    steps::Target,
    ui,
};

/// What to do once the pipeline has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PostInstall {
    Reboot,
    Stay,
    Chroot,
    Logs,
}

impl PostInstall {
    pub fn label_key(self) -> &'static str {
        match self {
            PostInstall::Reboot => "post_reboot",
            PostInstall::Stay => "post_stay",
            PostInstall::Chroot => "post_chroot",
            PostInstall::Logs => "post_logs",
        }
    }
}

/// Post-install menu. Shell and log viewer return to the menu; reboot and
/// stay end it. Cancelling counts as stay.
pub fn run(
    target: &mut Target<'_>,
    prompt: &mut dyn Prompt,
    log_file: &Path,
) -> Result<PostInstall, InstallerError> {
    let items: Vec<(String, String)> = PostInstall::iter()
        .map(|a| {
            let tag: &'static str = a.into();
            (tag.to_string(), a.label_key().to_string())
        })
        .collect();

    loop {
        let action = match prompt.menu("post_install", &items)? {
            Answer::Given(tag) => tag.parse().unwrap_or(PostInstall::Stay),
            Answer::Cancelled => PostInstall::Stay,
        };
        info!("post-install action: {:?}", action);

        match action {
            PostInstall::Reboot => {
                // A busy mount must not keep the machine from rebooting.
                target.try_run(Cmd::new("umount").args(["-R", target.root_str().as_str()]))?;
                target.run(Cmd::new("reboot"))?;
                return Ok(action);
            }
            PostInstall::Stay => {
                ui::print_info(&format!(
                    "Enter the new system any time:  arch-chroot {}",
                    target.root_str()
                ));
                ui::print_info(&format!(
                    "Unmount and reboot when ready:  umount -R {} && reboot",
                    target.root_str()
                ));
                return Ok(action);
            }
            PostInstall::Chroot => {
                ui::print_info("Type 'exit' or press Ctrl-D to leave the chroot.");
                target.interactive(Cmd::new("arch-chroot").arg(target.root_str()))?;
                ui::print_success("Exited chroot.");
            }
            PostInstall::Logs => {
                target.interactive(Cmd::new("less").arg(log_file.display().to_string()))?;
            }
        }
    }
}

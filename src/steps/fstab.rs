use tracing::info;

use crate::{cmd::Cmd, error::InstallerError, steps::Target};

/// Generates `/mnt/etc/fstab` using UUIDs via `genfstab`.
///
/// Equivalent to: `genfstab -U /mnt >> /mnt/etc/fstab`
pub fn generate(target: &mut Target<'_>) -> Result<(), InstallerError> {
    let out = target.run(Cmd::new("genfstab").args(["-U", &target.root_str()]))?;
    if target.dry_run() {
        info!("dry-run: fstab not written");
        return Ok(());
    }
    if out.stdout.trim().is_empty() {
        return Err(InstallerError::Target(
            "genfstab produced no entries; is the target mounted?".to_string(),
        ));
    }

    target.append("/etc/fstab", &out.stdout)?;
    info!("fstab written to {}", target.path("/etc/fstab").display());
    Ok(())
}

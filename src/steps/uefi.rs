use std::path::Path;

use tracing::info;

const EFI_FIRMWARE_DIR: &str = "/sys/firmware/efi";

/// Detects whether the system booted in UEFI or BIOS/Legacy mode
/// by checking the presence of `/sys/firmware/efi`.
///
/// In dry-run mode the path won't exist on most dev machines,
/// so a UEFI result is simulated and the full flow can be exercised.
pub fn detect(dry_run: bool) -> bool {
    let is_uefi = dry_run || detect_at(Path::new(EFI_FIRMWARE_DIR));
    info!(boot_mode = if is_uefi { "UEFI" } else { "BIOS" }, "firmware probed");
    is_uefi
}

fn detect_at(efi_dir: &Path) -> bool {
    efi_dir.exists()
}

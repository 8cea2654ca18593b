//! SPIFFS mount.

use std::ffi::CString;

use anyhow::Result;
use esp_idf_svc::sys::{esp, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};
use log::info;

/// Open files allowed at once on the mount.
const MAX_OPEN_FILES: usize = 5;

/// Mount the default SPIFFS partition at `base_path`, formatting it if needed.
pub fn mount_spiffs(base_path: &str) -> Result<()> {
    let base = CString::new(base_path)?;
    let conf = esp_vfs_spiffs_conf_t {
        base_path: base.as_ptr(),
        partition_label: std::ptr::null(),
        max_files: MAX_OPEN_FILES as _,
        format_if_mount_failed: true,
    };
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })?;
    info!("SPIFFS mounted at {}", base_path);
    Ok(())
}

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Write `contents` to `dest` through a sibling temp file and a rename, so an
/// interrupted write never leaves a truncated file behind.
pub(crate) fn write_atomically(dest: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_dest = dest.with_extension(format!(
        "{}.tmp",
        dest.extension().and_then(|e| e.to_str()).unwrap_or("")
    ));

    let result = fs::write(&tmp_dest, contents).and_then(|_| fs::rename(&tmp_dest, dest));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_dest);
    }
    Ok(result?)
}

use std::io::{self, Write};
use std::path::Path;

use crate::paths::tmp_sibling;

/// Create `dir` and any missing parents. On Unix, directories created here
/// get `mode`; existing directories are left untouched.
pub fn create_dir_all_with_mode(dir: &Path, mode: u32) -> Result<(), io::Error> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(dir)
    }

    #[cfg(not(unix))]
    {
        let _ = mode;
        std::fs::create_dir_all(dir)
    }
}

/// Write `contents` to `path` through a `.tmp` sibling and a rename, so
/// readers see either the previous file or the complete new one.
///
/// On Unix the file is created with `mode`. The temporary file is removed
/// if any step before the rename fails.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<(), io::Error> {
    let tmp = tmp_sibling(path);

    let result = write_new_file(&tmp, contents, mode).and_then(|()| std::fs::rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn write_new_file(path: &Path, contents: &[u8], mode: u32) -> Result<(), io::Error> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    // A leftover .tmp from an earlier crash keeps its old mode; OpenOptions
    // only applies `mode` on creation.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}

/// Remove a file, treating "not found" as success.
///
/// Returns whether a file was actually removed.
pub fn remove_if_exists(path: &Path) -> Result<bool, io::Error> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

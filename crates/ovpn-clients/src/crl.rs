//! Publishing the certificate revocation list.
//!
//! `easyrsa gen-crl` writes `pki/crl.pem`; the server reads a copy in its
//! own directory, usually owned by the unprivileged OpenVPN user. The copy
//! goes through a temporary file and a rename, and the previous owner is
//! reapplied afterwards.

use std::path::Path;

use crate::error::ClientError;

/// Mode of the published CRL.
const CRL_MODE: u32 = 0o640;

/// Owner of an existing file, captured before it is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

/// Owner of `path`, or `None` if it does not exist (or the platform has no
/// Unix ownership).
pub fn ownership(path: &Path) -> Option<Ownership> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        std::fs::metadata(path).ok().map(|meta| Ownership {
            uid: meta.uid(),
            gid: meta.gid(),
        })
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        None
    }
}

/// Copy `source` over `target`, keeping `target`'s previous owner.
pub fn refresh(source: &Path, target: &Path) -> Result<(), ClientError> {
    let previous = ownership(target);

    let data = std::fs::read(source).map_err(|e| ClientError::io(source, e))?;
    ovpn_common::persist::write_atomic(target, &data, CRL_MODE)
        .map_err(|e| ClientError::io(target, e))?;

    if let Some(owner) = previous {
        restore_ownership(target, owner)?;
    }

    tracing::info!(
        source = %source.display(),
        target = %target.display(),
        "CRL published"
    );
    Ok(())
}

#[cfg(unix)]
fn restore_ownership(target: &Path, owner: Ownership) -> Result<(), ClientError> {
    std::os::unix::fs::chown(target, Some(owner.uid), Some(owner.gid))
        .map_err(|e| ClientError::io(target, e))
}

#[cfg(not(unix))]
fn restore_ownership(_target: &Path, _owner: Ownership) -> Result<(), ClientError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovpn_common::test::temp_dir;

    #[test]
    fn copies_over_existing_target() {
        let dir = temp_dir("crl-copy");
        let source = dir.join("pki-crl.pem");
        let target = dir.join("crl.pem");
        std::fs::write(&source, "CRL-NEW\n").unwrap();
        std::fs::write(&target, "CRL-OLD\n").unwrap();
        let before = ownership(&target);

        refresh(&source, &target).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "CRL-NEW\n");
        assert_eq!(ownership(&target), before);
        assert!(!dir.join("crl.pem.tmp").exists());
    }

    #[test]
    fn creates_target_when_absent() {
        let dir = temp_dir("crl-create");
        let source = dir.join("pki-crl.pem");
        let target = dir.join("crl.pem");
        std::fs::write(&source, "CRL-FIRST\n").unwrap();

        refresh(&source, &target).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "CRL-FIRST\n");
    }

    #[test]
    fn missing_source_leaves_target_untouched() {
        let dir = temp_dir("crl-nosource");
        let target = dir.join("crl.pem");
        std::fs::write(&target, "CRL-OLD\n").unwrap();

        let err = refresh(&dir.join("absent.pem"), &target).unwrap_err();
        assert!(matches!(err, ClientError::Io { ref path, .. } if path.ends_with("absent.pem")));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "CRL-OLD\n");
    }

    #[cfg(unix)]
    #[test]
    fn published_crl_is_group_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir("crl-mode");
        let source = dir.join("pki-crl.pem");
        let target = dir.join("crl.pem");
        std::fs::write(&source, "CRL\n").unwrap();

        refresh(&source, &target).unwrap();
        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }
}

use std::path::PathBuf;

/// Default OpenVPN server directory.
///
/// Holds `easy-rsa/`, `client-common.txt`, `tc.key` and the published
/// `crl.pem`, the layout produced by the usual openvpn-install setup.
pub const DEFAULT_BASE_DIR: &str = "/data/openvpn/server";

/// Default directory for composed `.ovpn` client profiles.
pub const DEFAULT_OUTPUT_DIR: &str = "/data/openvpn/clients";

pub fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIR)
}

pub fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Temporary sibling used for write-then-rename.
///
/// `crl.pem` becomes `crl.pem.tmp`, `alice.ovpn` becomes `alice.ovpn.tmp`.
pub fn tmp_sibling(path: &std::path::Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn tmp_sibling_appends_suffix() {
        assert_eq!(
            tmp_sibling(Path::new("/srv/crl.pem")),
            PathBuf::from("/srv/crl.pem.tmp")
        );
        assert_eq!(
            tmp_sibling(Path::new("clients/alice.ovpn")),
            PathBuf::from("clients/alice.ovpn.tmp")
        );
    }
}

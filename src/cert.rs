use std::path::{Path, PathBuf};

/// Cert points to the certificate generated by mkcert, with additional CA and
/// trust info.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cert {
    pub(crate) ca_root: String,
    pub(crate) trusted: bool,
    pub(crate) domains: Vec<String>,
    pub(crate) file: PathBuf,
    pub(crate) key_file: PathBuf,
}

impl Cert {
    /// The mkcert directory containing its root CA. Empty when mkcert did not
    /// report it.
    pub fn ca_root(&self) -> &str {
        &self.ca_root
    }

    /// Whether the root CA is installed in all of the system trust stores. If
    /// not, the user needs to run `mkcert -install` before browsers will
    /// accept the certificate.
    pub fn trusted(&self) -> bool {
        self.trusted
    }

    /// Domains the certificate covers, in the order they were requested.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Path of the certificate file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Path of the private key.
    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    /// Rebase relative file paths onto `dir`, the directory mkcert ran in.
    /// Absolute paths are left alone; an unparsed (empty) path becomes `dir`.
    pub(crate) fn relative_to(mut self, dir: &Path) -> Self {
        self.file = rebase(self.file, dir);
        self.key_file = rebase(self.key_file, dir);
        self
    }
}

fn rebase(path: PathBuf, dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(file: &str, key: &str) -> Cert {
        Cert {
            file: file.into(),
            key_file: key.into(),
            ..Default::default()
        }
    }

    #[test]
    fn relative_paths_join_dir() {
        let c = cert("localhost.pem", "sub/localhost-key.pem").relative_to(Path::new("/tmp/x"));
        assert_eq!(c.file(), Path::new("/tmp/x/localhost.pem"));
        assert_eq!(c.key_file(), Path::new("/tmp/x/sub/localhost-key.pem"));
    }

    #[cfg(unix)]
    #[test]
    fn absolute_paths_unchanged() {
        let c = cert("/etc/a.pem", "/etc/a-key.pem").relative_to(Path::new("/tmp/x"));
        assert_eq!(c.file(), Path::new("/etc/a.pem"));
        assert_eq!(c.key_file(), Path::new("/etc/a-key.pem"));
    }

    #[test]
    fn empty_paths_become_dir() {
        let c = cert("", "").relative_to(Path::new("/tmp/x"));
        assert_eq!(c.file(), Path::new("/tmp/x"));
        assert_eq!(c.key_file(), Path::new("/tmp/x"));
    }
}

//! Locating a usable optimizer executable.
//!
//! Discovery checks the [`DAKOTA_EXE_ENV`] override first, then walks `PATH`
//! looking for a `dakota` executable. Versions are read from the install
//! path itself (`Dakota-6.16.0/bin/dakota` style layouts); an install whose
//! version is known and below the minimum is skipped, an install with no
//! recognizable version is trusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding discovery with an explicit executable.
pub const DAKOTA_EXE_ENV: &str = "DAKLINK_DAKOTA_EXE";

/// Executable name searched for on `PATH`.
const DAKOTA_EXE_NAME: &str = "dakota";

/// Oldest optimizer release the driver protocol supports.
pub const MIN_DAKOTA_VERSION: ToolVersion = ToolVersion::new(5, 3, 1);

/// A `major.minor.patch` tool version. Missing components parse as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `"6"`, `"6.16"`, or `"6.16.0"` forms.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A discovered optimizer installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DakotaInstall {
    pub exe: PathBuf,
    /// Version read from the install path, when one was recognizable.
    pub version: Option<ToolVersion>,
}

/// Find an optimizer executable satisfying `min_version`.
///
/// Returns `None` when nothing qualifies; the caller reports that as the
/// final "cannot run" outcome and starts no process.
pub fn find_dakota(min_version: ToolVersion) -> Option<DakotaInstall> {
    if let Some(override_path) = std::env::var_os(DAKOTA_EXE_ENV) {
        let exe = PathBuf::from(override_path);
        if exe.is_file() {
            info!(exe = %exe.display(), "using optimizer from environment override");
            return Some(DakotaInstall {
                version: version_from_path(&exe),
                exe,
            });
        }
        warn!(
            exe = %exe.display(),
            "{DAKOTA_EXE_ENV} does not point at a file; falling back to PATH"
        );
    }

    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(DAKOTA_EXE_NAME);
        if !is_executable(&candidate) {
            continue;
        }
        let version = version_from_path(&candidate);
        if let Some(found) = version {
            if found < min_version {
                debug!(
                    exe = %candidate.display(),
                    %found,
                    required = %min_version,
                    "skipping optimizer below the required version"
                );
                continue;
            }
        }
        info!(exe = %candidate.display(), version = ?version, "found optimizer on PATH");
        return Some(DakotaInstall {
            exe: candidate,
            version,
        });
    }
    None
}

/// Extract a version from path components such as `Dakota-6.16.0`.
fn version_from_path(path: &Path) -> Option<ToolVersion> {
    let mut version = None;
    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        let lowered = text.to_lowercase();
        let Some(rest) = lowered.strip_prefix(DAKOTA_EXE_NAME) else {
            continue;
        };
        let digits: String = rest
            .trim_start_matches(['-', '_', '.', ' '])
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if let Some(parsed) = ToolVersion::parse(&digits) {
            version = Some(parsed);
        }
    }
    version
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_forms() {
        assert_eq!(ToolVersion::parse("6"), Some(ToolVersion::new(6, 0, 0)));
        assert_eq!(ToolVersion::parse("6.16"), Some(ToolVersion::new(6, 16, 0)));
        assert_eq!(
            ToolVersion::parse("5.3.1"),
            Some(ToolVersion::new(5, 3, 1))
        );
        assert_eq!(ToolVersion::parse(""), None);
        assert_eq!(ToolVersion::parse("abc"), None);
        assert_eq!(ToolVersion::parse("6.16.0.1"), None);
    }

    #[test]
    fn orders_numerically() {
        assert!(ToolVersion::new(5, 3, 1) < ToolVersion::new(6, 0, 0));
        assert!(ToolVersion::new(6, 16, 0) > ToolVersion::new(6, 2, 0));
        assert!(ToolVersion::new(5, 3, 1) >= MIN_DAKOTA_VERSION);
        assert!(ToolVersion::new(5, 3, 0) < MIN_DAKOTA_VERSION);
    }

    #[test]
    fn displays_dotted() {
        assert_eq!(ToolVersion::new(6, 16, 0).to_string(), "6.16.0");
    }

    #[test]
    fn reads_version_from_install_path() {
        assert_eq!(
            version_from_path(Path::new("/opt/Dakota-5.3.1/bin/dakota")),
            Some(ToolVersion::new(5, 3, 1))
        );
        assert_eq!(
            version_from_path(Path::new("/usr/local/dakota-6.16/bin/dakota")),
            Some(ToolVersion::new(6, 16, 0))
        );
        assert_eq!(version_from_path(Path::new("/usr/bin/dakota")), None);
        assert_eq!(version_from_path(Path::new("/usr/bin/other")), None);
    }

    #[test]
    fn environment_override_wins() {
        let _guard = crate::tests_env_lock();
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("dakota");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();

        std::env::set_var(DAKOTA_EXE_ENV, &exe);
        let install = find_dakota(MIN_DAKOTA_VERSION);
        std::env::remove_var(DAKOTA_EXE_ENV);

        let install = install.expect("override should be honored");
        assert_eq!(install.exe, exe);
    }
}

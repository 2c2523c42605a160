//! Host platform tokens used to select artifacts.

use std::fmt;

/// An `os`/`arch` pair in the tokens used by plugin distributions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// `linux`, `darwin` or `windows`.
    pub os: String,
    /// `amd64` or `arm64`.
    pub arch: String,
}

impl Platform {
    /// Create a platform from explicit tokens.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was compiled for.
    #[must_use]
    pub fn host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(os, arch)
    }

    /// File name of a plugin binary on this platform.
    #[must_use]
    pub fn binary_name(&self, plugin: &str) -> String {
        let suffix = if self.os == "windows" { ".exe" } else { "" };
        format!("plinth-{plugin}-{}_{}{suffix}", self.os, self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_uses_distribution_tokens() {
        let host = Platform::host();
        assert_ne!(host.os, "macos");
        assert_ne!(host.arch, "x86_64");
        assert_ne!(host.arch, "aarch64");
    }

    #[test]
    fn binary_name_layout() {
        assert_eq!(
            Platform::new("linux", "amd64").binary_name("login"),
            "plinth-login-linux_amd64"
        );
        assert_eq!(
            Platform::new("windows", "amd64").binary_name("login"),
            "plinth-login-windows_amd64.exe"
        );
    }
}

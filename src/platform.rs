//! Platform capability probe.
//!
//! Immutable facts about the running OS and build. Constructed once at
//! startup and copied into whoever needs it; tests build their own values to
//! exercise each platform's branches on any host.

use serde::Serialize;

/// Operating system family the host is running on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    MacOS,
    Windows,
    Linux,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub os: Os,
    /// Running from an installed bundle rather than `cargo run`.
    pub packaged: bool,
    /// Development build (content served by the dev server).
    pub dev: bool,
}

impl PlatformInfo {
    /// Probe the current process.
    pub fn current() -> Self {
        let os = if cfg!(target_os = "macos") {
            Os::MacOS
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else {
            Os::Linux
        };
        let dev = cfg!(debug_assertions);
        Self {
            os,
            packaged: !dev && std::env::var_os("CARGO").is_none(),
            dev,
        }
    }

    pub fn new(os: Os, dev: bool) -> Self {
        Self {
            os,
            packaged: !dev,
            dev,
        }
    }

    pub fn is_macos(&self) -> bool {
        self.os == Os::MacOS
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    pub fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    pub fn is_dev(&self) -> bool {
        self.dev
    }

    pub fn is_packaged(&self) -> bool {
        self.packaged
    }
}

//! Per-platform location of the `pos-system` config files.
//!
//! | Platform | Directory                                        |
//! |----------|--------------------------------------------------|
//! | Linux    | `$XDG_CONFIG_HOME/pos-system` or `~/.config/...` |
//! | macOS    | `~/Library/Application Support/PosSystem`        |
//! | Windows  | `%APPDATA%\PosSystem`                            |

use std::path::PathBuf;

/// Returns the platform config directory shared by server and kiosk, or
/// `None` when the base directory cannot be determined.
pub fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PosSystem"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("pos-system"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PosSystem")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

/// Path of `file_name` inside [`platform_config_dir`].
pub fn config_file(file_name: &str) -> Option<PathBuf> {
    platform_config_dir().map(|dir| dir.join(file_name))
}

//! Filesystem locations shared by the daemon and the TUI.

use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    // Use ~/.local/share/courtwatch/ (XDG standard) on unix for consistency
    // across macOS and Linux.
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("courtwatch")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courtwatch")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("courtwatch")
    }
    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("courtwatch")
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}

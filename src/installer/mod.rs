// Player installer - gets mpv onto the machine through whatever package manager is around
// Only consulted to decide what setup guidance to print; playback never depends on it.

use crossterm::style::Stylize;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("No supported package manager found")]
    NoPackageManager,

    #[error("Installation failed with code {0:?}")]
    Failed(Option<i32>),

    #[error("Failed to run installer: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Brew,
    Apt,
    Dnf,
    Yum,
    Pacman,
    Choco,
    Scoop,
    Winget,
}

impl PackageManager {
    /// Managers that can install the player on this platform, in preference order
    pub fn candidates() -> &'static [PackageManager] {
        if cfg!(target_os = "windows") {
            &[PackageManager::Choco, PackageManager::Scoop, PackageManager::Winget]
        } else if cfg!(target_os = "macos") {
            &[PackageManager::Brew]
        } else {
            &[
                PackageManager::Apt,
                PackageManager::Dnf,
                PackageManager::Yum,
                PackageManager::Pacman,
            ]
        }
    }

    pub fn detect() -> Option<Self> {
        Self::candidates()
            .iter()
            .copied()
            .find(|pm| which::which(pm.executable()).is_ok())
    }

    pub fn executable(&self) -> &'static str {
        match self {
            PackageManager::Brew => "brew",
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Yum => "yum",
            PackageManager::Pacman => "pacman",
            PackageManager::Choco => "choco",
            PackageManager::Scoop => "scoop",
            PackageManager::Winget => "winget",
        }
    }

    pub fn install_command(&self) -> &'static str {
        match self {
            PackageManager::Brew => "brew install mpv",
            PackageManager::Apt => "sudo apt-get update && sudo apt-get install -y mpv",
            PackageManager::Dnf => "sudo dnf install -y mpv",
            PackageManager::Yum => "sudo yum install -y mpv",
            PackageManager::Pacman => "sudo pacman -S --noconfirm mpv",
            PackageManager::Choco => "choco install mpv -y",
            PackageManager::Scoop => "scoop install mpv",
            PackageManager::Winget => "winget install --id=mpv-player.mpv -e",
        }
    }
}

pub fn is_external_player_installed(binary: &str) -> bool {
    which::which(binary).is_ok()
}

/// First line of `<binary> --version`, if it runs
pub async fn player_version(binary: &str) -> Option<String> {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

/// Install the player if it is missing. Returns whether it is usable afterwards.
pub async fn install(binary: &str) -> bool {
    if is_external_player_installed(binary) {
        println!("{}", "MPV is already installed!".green());
        if let Some(version) = player_version(binary).await {
            println!("{}", version.dark_grey());
        }
        return true;
    }

    let result = match PackageManager::detect() {
        Some(pm) => {
            println!("{}", format!("Found package manager: {}", pm.executable()).yellow());
            run_install_command(pm).await
        }
        None => Err(InstallError::NoPackageManager),
    };

    if let Err(e) = result {
        warn!("Player installation failed: {}", e);
        println!("{} {}", "Installation failed!".red(), e);
        print_manual_instructions();
        return false;
    }

    if is_external_player_installed(binary) {
        info!("Player installed");
        println!("{}", "MPV installed successfully!".green());
        if let Some(version) = player_version(binary).await {
            println!("{}", version.dark_grey());
        }
        true
    } else {
        println!("{}", "MPV installation verification failed!".red());
        print_manual_instructions();
        false
    }
}

async fn run_install_command(pm: PackageManager) -> Result<(), InstallError> {
    let command = pm.install_command();
    println!("{}", format!("Installing MPV using {}...", pm.executable()).yellow());
    println!("{}", format!("Command: {}", command).dark_grey());
    info!("Running installer: {}", command);

    let (shell, flag) = if cfg!(target_os = "windows") {
        ("cmd", "/c")
    } else {
        ("sh", "-c")
    };
    let status = Command::new(shell).arg(flag).arg(command).status().await?;

    if status.success() {
        Ok(())
    } else {
        Err(InstallError::Failed(status.code()))
    }
}

/// (label, command) pairs for doing it by hand on this platform
pub fn manual_instructions() -> &'static [(&'static str, &'static str)] {
    if cfg!(target_os = "windows") {
        &[
            ("Chocolatey", "choco install mpv"),
            ("Scoop", "scoop install mpv"),
            ("Winget", "winget install mpv-player.mpv"),
            ("Manual", "Download from https://mpv.io/installation/"),
        ]
    } else if cfg!(target_os = "macos") {
        &[("Homebrew", "brew install mpv"), ("MacPorts", "sudo port install mpv")]
    } else {
        &[
            ("Ubuntu/Debian", "sudo apt-get install mpv"),
            ("Fedora/RHEL", "sudo dnf install mpv"),
            ("Arch Linux", "sudo pacman -S mpv"),
        ]
    }
}

pub fn print_manual_instructions() {
    println!("{}", "\nManual Installation Required".yellow().bold());
    println!("Please install MPV manually using the appropriate method for your system:\n");
    for &(label, command) in manual_instructions() {
        println!("• {}: {}", label, command.dark_grey());
    }
    println!(
        "{}",
        "\nAfterwards run termtunes again, or try `termtunes install-player`.".dark_grey()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_commands_target_mpv() {
        for pm in [
            PackageManager::Brew,
            PackageManager::Apt,
            PackageManager::Dnf,
            PackageManager::Yum,
            PackageManager::Pacman,
            PackageManager::Choco,
            PackageManager::Scoop,
            PackageManager::Winget,
        ] {
            assert!(pm.install_command().contains("mpv"), "{:?}", pm);
        }
        assert_eq!(PackageManager::Apt.executable(), "apt-get");
    }

    #[test]
    fn test_candidates_match_platform() {
        let candidates = PackageManager::candidates();
        assert!(!candidates.is_empty());
        if cfg!(target_os = "linux") {
            assert!(candidates.contains(&PackageManager::Apt));
            assert!(!candidates.contains(&PackageManager::Choco));
        }
    }

    #[test]
    fn test_missing_player_is_detected() {
        assert!(!is_external_player_installed("termtunes-definitely-missing-player"));
        assert!(!manual_instructions().is_empty());
    }

    #[tokio::test]
    async fn test_version_of_missing_binary_is_none() {
        assert!(player_version("termtunes-definitely-missing-player").await.is_none());
    }
}

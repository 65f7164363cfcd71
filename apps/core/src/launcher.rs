use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::model::{Destination, Profile};
use crate::profiles::{family_for, ProfileFamily};

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("empty executable path")]
    EmptyPath,
    #[error("executable does not exist: {}", .0.display())]
    MissingPath(PathBuf),
    #[error("failed to start {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Opens a URL in a destination. Implementations return once the launch is
/// handed off; they never wait for the destination to exit.
pub trait Launcher: Send {
    fn launch(
        &self,
        destination: &Destination,
        url: &str,
        profile: Option<&Profile>,
    ) -> Result<(), LaunchError>;
}

/// Command-line arguments that open `url`, in `profile` when given.
pub fn launch_args(destination: &Destination, url: &str, profile: Option<&Profile>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(profile) = profile {
        match family_for(&destination.id) {
            Some(ProfileFamily::Chromium) => {
                args.push(format!("--profile-directory={}", profile.directory_name));
            }
            Some(ProfileFamily::Firefox) => {
                args.push("-P".to_string());
                args.push(profile.name.clone());
            }
            None => {}
        }
    }
    args.push(url.to_string());
    args
}

pub fn validate_executable(destination: &Destination) -> Result<(), LaunchError> {
    let path = &destination.executable_path;
    if path.as_os_str().is_empty() {
        return Err(LaunchError::EmptyPath);
    }
    // Bare program names are resolved through PATH by the OS.
    if path.is_absolute() && !path.exists() {
        return Err(LaunchError::MissingPath(path.clone()));
    }
    Ok(())
}

/// Spawns the destination executable directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        destination: &Destination,
        url: &str,
        profile: Option<&Profile>,
    ) -> Result<(), LaunchError> {
        validate_executable(destination)?;
        let path = destination.executable_path.clone();
        let args = launch_args(destination, url, profile);

        let mut child = Command::new(&path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                path: path.clone(),
                source,
            })?;
        tracing::info!(destination = %destination.id, pid = child.id(), "destination launched");

        // Reap the child in the background so it never lingers as a zombie.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

// src/integrations/file_manager.rs
//
// Reveal downloaded media in the OS file manager.
//
// CRITICAL RULES:
// - Fire and forget: the spawned process is never awaited
// - Missing paths are rejected before anything is launched

use std::path::Path;
use std::process::{Command, Stdio};

use crate::integrations::capabilities::{CapabilityError, FileManager};

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileManager;

impl SystemFileManager {
    pub fn new() -> Self {
        Self
    }

    fn command_for(path: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            if path.is_file() {
                cmd.arg("-R");
            }
            cmd.arg(path);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("explorer");
            if path.is_file() {
                cmd.arg(format!("/select,{}", path.display()));
            } else {
                cmd.arg(path);
            }
            cmd
        } else {
            // xdg-open cannot select a file; open its folder instead.
            let target = if path.is_file() {
                path.parent().unwrap_or(path)
            } else {
                path
            };
            let mut cmd = Command::new("xdg-open");
            cmd.arg(target);
            cmd
        }
    }
}

impl FileManager for SystemFileManager {
    fn open(&self, path: &Path) -> Result<(), CapabilityError> {
        if !path.exists() {
            return Err(CapabilityError::ContentRemoved(format!(
                "Path does not exist: {}",
                path.display()
            )));
        }

        Self::command_for(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| CapabilityError::Unsupported(format!("Cannot launch file manager: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_rejected() {
        let manager = SystemFileManager::new();
        let result = manager.open(Path::new("/definitely/not/here/postkeeper"));
        assert!(matches!(result, Err(CapabilityError::ContentRemoved(_))));
    }
}

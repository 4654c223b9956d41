//! Foreground optimizer launch.

use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

use dak_types::{DakResult, LaunchError};

use crate::command::DakotaCommand;
use crate::discovery::DakotaInstall;

/// Run the optimizer in the foreground and wait for it to exit.
///
/// The child runs with `run_dir` as its working directory; the caller's own
/// working directory is never touched, so there is nothing to restore on any
/// exit path. Returns the exit code on success.
pub fn launch_foreground(
    install: &DakotaInstall,
    command: &DakotaCommand,
    run_dir: &Path,
    nodes: usize,
) -> DakResult<i32> {
    let (program, args) = command.invocation(&install.exe, nodes);
    info!(
        program = %program,
        nodes,
        run_dir = %run_dir.display(),
        "launching optimizer"
    );

    let status = Command::new(&program)
        .args(&args)
        .current_dir(run_dir)
        .status()
        .map_err(|e| LaunchError::SpawnFailed {
            program: program.clone(),
            message: e.to_string(),
        })?;

    if !status.success() {
        warn!(program = %program, code = ?status.code(), "optimizer exited with failure");
        return Err(LaunchError::OptimizerFailed {
            code: status.code(),
        }
        .into());
    }
    info!(program = %program, "optimizer finished");
    Ok(status.code().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dak_types::{DakError, RunConfig};

    fn install_for(script: &Path) -> DakotaInstall {
        DakotaInstall {
            exe: script.to_path_buf(),
            version: None,
        }
    }

    #[cfg(unix)]
    fn write_fake_optimizer(dir: &Path, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("dakota");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn sample_command() -> DakotaCommand {
        DakotaCommand::new(&RunConfig::new("demo", "/tmp/run1", vec![1.0])).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_the_given_directory() {
        let bin_dir = tempfile::tempdir().unwrap();
        let run_dir = tempfile::tempdir().unwrap();
        let exe = write_fake_optimizer(bin_dir.path(), "touch launched.txt\nexit 0");

        let code =
            launch_foreground(&install_for(&exe), &sample_command(), run_dir.path(), 1).unwrap();
        assert_eq!(code, 0);
        assert!(run_dir.path().join("launched.txt").exists());
        assert!(!bin_dir.path().join("launched.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_surfaces_as_launch_error() {
        let bin_dir = tempfile::tempdir().unwrap();
        let run_dir = tempfile::tempdir().unwrap();
        let exe = write_fake_optimizer(bin_dir.path(), "exit 3");

        let err = launch_foreground(&install_for(&exe), &sample_command(), run_dir.path(), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            DakError::Launch(LaunchError::OptimizerFailed { code: Some(3) })
        ));
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let run_dir = tempfile::tempdir().unwrap();
        let install = install_for(Path::new("/nonexistent/daklink-test/dakota"));

        let err =
            launch_foreground(&install, &sample_command(), run_dir.path(), 1).unwrap_err();
        assert!(matches!(
            err,
            DakError::Launch(LaunchError::SpawnFailed { .. })
        ));
    }
}

//! External process execution.
//!
//! A thin wrapper around `std::process::Command` for build tools that write
//! their own log file.

use std::path::Path;
use std::process::Command;

use corollary_core::CommandError;
use tracing::{debug, info};

/// Run `program` with `args` in `cwd` and wait for it to finish.
///
/// `log` names the file the program logs to; it is reported on failure.
///
/// # Errors
///
/// Returns [`CommandError::File`] if `cwd` is not a directory,
/// [`CommandError::Io`] if the program cannot be started, or
/// [`CommandError::Process`] if it exits with a non-zero status.
pub fn run_logged(program: &str, args: &[String], cwd: &Path, log: Option<&Path>) -> Result<(), CommandError> {
    if !cwd.is_dir() {
        return Err(CommandError::file(cwd, "directory does not exist"));
    }

    debug!(program, ?args, cwd = %cwd.display(), "spawning process");
    let status = Command::new(program).args(args).current_dir(cwd).status()?;

    if !status.success() {
        return Err(CommandError::Process {
            program: program.to_string(),
            code: status.code(),
            log: log.map(|l| l.display().to_string()),
        });
    }

    info!(program, cwd = %cwd.display(), "process finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_success() {
        let dir = tempfile::tempdir().unwrap();
        run_logged("sh", &sh("touch ran"), dir.path(), None).unwrap();
        assert!(dir.path().join("ran").exists());
    }

    #[test]
    fn test_failure_reports_code_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("build.log");
        let err = run_logged("sh", &sh("exit 3"), dir.path(), Some(&log)).unwrap_err();
        match &err {
            CommandError::Process { code, log: Some(path), .. } => {
                assert_eq!(*code, Some(3));
                assert!(path.ends_with("build.log"));
            }
            other => panic!("expected Process, got: {other:?}"),
        }
        assert!(err.to_string().contains("build.log"));
    }

    #[test]
    fn test_missing_directory() {
        let err = run_logged("sh", &sh("true"), Path::new("/nonexistent/directory/xyz"), None).unwrap_err();
        assert!(matches!(err, CommandError::File { .. }));
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_logged("corollary-no-such-program", &[], dir.path(), None).unwrap_err();
        assert!(matches!(err, CommandError::Io(_)));
    }
}

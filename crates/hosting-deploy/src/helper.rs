use std::{
    io,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

use derive_more::{Display, Error, From};
use tracing::debug;

/// Errors of an external helper program run.
#[derive(Debug, Display, From, Error)]
pub(crate) enum HelperError {
    /// Helper binary cannot be located.
    #[display(fmt = "unable to locate {}: {}", program, source)]
    #[from(ignore)]
    NotFound {
        /// Configured helper program name.
        program: String,

        /// [`which`] lookup error.
        source: which::Error,
    },

    /// Helper could not be executed.
    #[display(fmt = "unable to run helper: {}", _0)]
    Spawn(io::Error),

    /// Helper exited with a non-zero status.
    #[display(fmt = "{} exited with code {}: {}", program, code, stderr)]
    #[from(ignore)]
    NonZeroExit {
        /// Configured helper program name.
        program: String,

        /// Exit code, or `-1` if the helper was terminated by a signal.
        code: i32,

        /// Captured standard error output. Empty if the helper wrote to the
        /// terminal directly.
        stderr: String,
    },
}

/// External program invocation, resolved on `PATH`.
pub(crate) struct Helper {
    /// Program name or path.
    program: String,

    /// Arguments passed to the program.
    args: Vec<String>,
}

impl Helper {
    /// Create an invocation of `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Append `args` to the invocation.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Invocation arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Resolve the program location on `PATH`.
    fn locate(&self) -> Result<PathBuf, HelperError> {
        which::which(&self.program).map_err(|source| HelperError::NotFound {
            program: self.program.clone(),
            source,
        })
    }

    /// Prepare the command with stdin detached.
    fn command(&self) -> Result<Command, HelperError> {
        let program = self.locate()?;

        debug!(program = %program.display(), args = ?self.args, "running helper");

        let mut command = Command::new(program);
        command.args(&self.args).stdin(Stdio::null());

        Ok(command)
    }

    /// Convert a failed exit status into [`HelperError::NonZeroExit`].
    fn check_status(&self, output: &Output) -> Result<(), HelperError> {
        if output.status.success() {
            return Ok(());
        }

        Err(HelperError::NonZeroExit {
            program: self.program.clone(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run the helper to completion, capturing its standard output.
    pub fn output(&self) -> Result<Vec<u8>, HelperError> {
        let output = self.command()?.output()?;

        self.check_status(&output)?;

        Ok(output.stdout)
    }

    /// Run the helper in `dir`, letting it write to the terminal.
    pub fn run_in(&self, dir: &Path) -> Result<(), HelperError> {
        let output = self
            .command()?
            .current_dir(dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?
            .wait_with_output()?;

        self.check_status(&output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program() {
        let error = Helper::new("definitely-not-a-helper", vec![])
            .output()
            .unwrap_err();

        assert!(matches!(error, HelperError::NotFound { .. }));
        assert!(error.to_string().contains("definitely-not-a-helper"));
    }

    #[test]
    fn appended_args() {
        let helper = Helper::new("firebase", vec![String::from("--debug")])
            .with_args(["deploy", "--only", "hosting"]);

        assert_eq!(helper.args(), ["--debug", "deploy", "--only", "hosting"]);
    }

    #[cfg(unix)]
    #[test]
    fn captured_output() {
        let stdout = Helper::new("echo", vec![String::from("hello")])
            .output()
            .unwrap();

        assert_eq!(stdout, b"hello\n");
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_directory() {
        let dir = tempfile::TempDir::new().unwrap();

        Helper::new("sh", vec![String::from("-c"), String::from("touch marker")])
            .run_in(dir.path())
            .unwrap();

        assert!(dir.path().join("marker").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failed_run() {
        let dir = tempfile::TempDir::new().unwrap();

        let error = Helper::new("sh", vec![String::from("-c"), String::from("exit 4")])
            .run_in(dir.path())
            .unwrap_err();

        match error {
            HelperError::NonZeroExit {
                program,
                code,
                stderr,
            } => {
                assert_eq!(program, "sh");
                assert_eq!(code, 4);
                assert!(stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

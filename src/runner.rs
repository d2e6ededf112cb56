use std::fmt;
use std::process::Command;

/// Failure of an external SCM client invocation. Carries the exit status
/// and whatever the process wrote to stderr so warnings can name the
/// offending command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    pub command: String,
    pub status: Option<i32>,
    pub stderr: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(
                f,
                "command '{}' exited with status {}: {}",
                self.command,
                code,
                self.stderr.trim()
            ),
            None => write!(
                f,
                "command '{}' failed to run: {}",
                self.command,
                self.stderr.trim()
            ),
        }
    }
}

impl std::error::Error for CommandError {}

/// Blocking external process invocation. The library never spawns
/// processes directly; everything goes through this seam so tests can
/// substitute canned output.
pub trait CommandRunner {
    /// Runs `argv` and returns captured stdout as text.
    /// Non-zero exit becomes a [`CommandError`].
    fn run(&self, argv: &[String]) -> Result<String, CommandError>;
}

/// Runs commands with `std::process::Command` in a working directory.
/// Output bytes are decoded lossily; SCM logs routinely mix encodings.
pub struct SystemRunner {
    cwd: std::path::PathBuf,
}

impl SystemRunner {
    pub fn new(cwd: impl Into<std::path::PathBuf>) -> Self {
        SystemRunner { cwd: cwd.into() }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> Result<String, CommandError> {
        let display = argv.join(" ");
        log::debug!("running: {display}");
        let (program, args) = argv.split_first().ok_or_else(|| CommandError {
            command: display.clone(),
            status: None,
            stderr: "empty command line".to_string(),
        })?;
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .output()
            .map_err(|e| CommandError {
                command: display.clone(),
                status: None,
                stderr: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(CommandError {
                command: display,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

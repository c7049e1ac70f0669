use log::debug;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};

use crate::error::{Error, Operation, Result};

/// Captured result of a finished child process.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
    /// Shell-quoted rendering of the command line, for diagnostics.
    pub command: String,
}

impl CommandOutput {
    fn from_output(command: String, output: Output) -> Self {
        CommandOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command,
        }
    }

    /// Non-empty stdout lines.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stdout)
            .lines()
            .map(|l| l.trim_end().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Converts a non-zero exit into `Error::ExternalProcess`.
    pub fn check(self, operation: Operation) -> Result<Self> {
        if self.status.success() {
            return Ok(self);
        }
        Err(Error::ExternalProcess {
            operation,
            command: self.command,
            status: describe_status(&self.status),
            stderr: self.stderr.trim_end().to_string(),
        })
    }
}

/// Renders a program and its arguments as a copy-pastable shell line.
pub fn render<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(|a| a.as_ref()))
        .map(|a| {
            let s = a.to_string_lossy();
            match shlex::try_quote(&s) {
                Ok(q) => q.into_owned(),
                Err(_) => format!("{:?}", s),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` with `args` directly (no shell) and waits for it to exit.
///
/// A failure to spawn is an error; a non-zero exit is not, see
/// [`CommandOutput::check`].
pub fn run<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> Result<CommandOutput> {
    let command = render(program, args);
    debug!("Running: {command}");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()?;
    Ok(CommandOutput::from_output(command, output))
}

/// Runs a command and returns its stdout lines, failing on non-zero exit.
pub fn run_checked<S: AsRef<OsStr>>(
    operation: Operation,
    program: &Path,
    args: &[S],
) -> Result<Vec<String>> {
    Ok(run(program, args)?.check(operation)?.lines())
}

/// Runs a shell pipeline with `input` bound to `$1` and returns its stdout.
///
/// The path is passed as a positional parameter, never spliced into the
/// script text.
pub fn run_pipeline(operation: Operation, script: &str, input: &Path) -> Result<Vec<u8>> {
    let args = [OsStr::new("-c"), OsStr::new(script), OsStr::new("sh"), input.as_os_str()];
    let out = run(Path::new("sh"), &args)?.check(operation)?;
    Ok(out.stdout)
}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if let Some(sig) = status.signal() {
                    return format!("killed by signal {sig}");
                }
            }
            status.to_string()
        }
    }
}

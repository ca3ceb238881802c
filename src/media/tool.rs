//! Bounded invocation of external media tools.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::runtime::Builder;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Captured result of a finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, -1 when terminated by a signal.
    pub exit_code: i32,
    /// Stdout followed by stderr.
    pub output: String,
}

/// A named command-line tool run with a hard timeout.
#[derive(Debug, Clone)]
pub struct MediaTool {
    program: String,
    timeout: Duration,
}

impl MediaTool {
    /// Tool `program` whose runs are killed after `timeout`.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run with `args`; a non-zero exit is an error.
    pub fn run<I, A>(&self, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let out = self.run_unchecked(args)?;
        if out.exit_code != 0 {
            return Err(Error::ToolFailed {
                tool: self.program.clone(),
                exit_code: out.exit_code,
                hint: remediation_hint(&self.program, &out.output)
                    .map(|h| format!("\n{h}"))
                    .unwrap_or_default(),
                output: out.output,
            });
        }
        Ok(out)
    }

    /// Run with `args` and return whatever exit code it produced.
    ///
    /// The child is killed when the timeout elapses.
    pub fn run_unchecked<I, A>(&self, args: I) -> Result<ToolOutput>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!("running {:?}", cmd);

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| Error::ToolSpawn {
                tool: self.program.clone(),
                source,
            })?;
        runtime.block_on(self.wait(cmd))
    }

    async fn wait(&self, mut cmd: Command) -> Result<ToolOutput> {
        let child = cmd.spawn().map_err(|source| Error::ToolSpawn {
            tool: self.program.clone(),
            source,
        })?;

        let Ok(finished) = timeout(self.timeout, child.wait_with_output()).await else {
            return Err(Error::ToolTimeout {
                tool: self.program.clone(),
                timeout_secs: self.timeout.as_secs(),
            });
        };
        let finished = finished?;

        let mut output = String::from_utf8_lossy(&finished.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&finished.stderr));
        trace!("{} exited with {}: {output}", self.program, finished.status);

        Ok(ToolOutput {
            exit_code: finished.status.code().unwrap_or(-1),
            output,
        })
    }
}

/// A remediation hint when the failure looks like a missing tool or
/// missing credentials.
pub fn remediation_hint(tool: &str, output: &str) -> Option<String> {
    let name = Path::new(tool)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(tool)
        .to_ascii_lowercase();
    let lower = output.to_ascii_lowercase();

    let missing = lower.contains("not found")
        || lower.contains("not recognized")
        || lower.contains("no such file or directory");
    let unauthenticated = lower.contains("401")
        || lower.contains("403")
        || lower.contains("permission denied")
        || lower.contains("not authorized")
        || lower.contains("unauthenticated");

    if missing {
        return Some(match name.as_str() {
            "ffprobe" => "Ensure `ffprobe` (part of ffmpeg) is installed and on your PATH.".to_string(),
            _ => format!("Ensure `{name}` is installed and available on your PATH."),
        });
    }
    unauthenticated.then(|| {
        "The bucket refused the request; check that the object is publicly readable.".to_string()
    })
}

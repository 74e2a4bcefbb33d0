use crate::config::GeneratorConfig;
use crate::generator::{strip_code_fences, GenerationError, GenerationRequest, Generator};
use futures::future::BoxFuture;
use std::io;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// Runs an external program per request.
///
/// The request is written to the program's stdin as JSON; whatever it prints
/// on stdout is the response. Any model client can be plugged in this way.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    strip_fences: bool,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
            strip_fences: true,
        }
    }

    /// Build from config; `None` when no command is configured.
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout: config.timeout_secs.map(Duration::from_secs),
            strip_fences: config.strip_fences,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_strip_fences(mut self, strip: bool) -> Self {
        self.strip_fences = strip;
        self
    }

    async fn run(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GenerationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange(child, payload))
                .await
                .map_err(|_| GenerationError::Timeout {
                    secs: limit.as_secs(),
                })??,
            None => exchange(child, payload).await?,
        };

        if !output.status.success() {
            return Err(GenerationError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|_| GenerationError::InvalidUtf8)?;
        tracing::debug!(program = %self.program, bytes = text.len(), "generator responded");

        Ok(if self.strip_fences {
            strip_code_fences(&text).to_string()
        } else {
            text
        })
    }
}

/// Feed `payload` to the child while collecting its output.
///
/// Both directions run together, so a program that writes before it has
/// read all of its input cannot fill the stdout pipe and stall. Dropping
/// this future kills the child.
async fn exchange(mut child: Child, payload: Vec<u8>) -> Result<Output, GenerationError> {
    let stdin = child.stdin.take();
    let feed = async move {
        let Some(mut stdin) = stdin else {
            return Ok(());
        };
        match stdin.write_all(&payload).await {
            // the program exited without reading everything; its status decides
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            result => result,
        }
        // stdin is dropped here, closing the pipe
    };

    let (fed, output) = futures::join!(feed, child.wait_with_output());
    let output = output?;
    fed?;
    Ok(output)
}

impl Generator for CommandGenerator {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, GenerationError>> {
        Box::pin(self.run(request))
    }
}

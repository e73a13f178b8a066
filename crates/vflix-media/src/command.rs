//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Grace period between SIGTERM and SIGKILL when tearing down an encoder.
const TERMINATE_GRACE_SECS: u64 = 5;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an input argument (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Extract a single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-vframes").output_arg("1")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Outcome of waiting for the encoder process.
enum ProcessExit {
    Finished(ExitStatus),
    Cancelled,
    TimedOut(u64),
}

/// Runner for FFmpeg commands with timeout and cancellation.
pub struct FfmpegRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stderr = child.stderr.take().expect("stderr not captured");
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            stderr.read_to_string(&mut buf).await.ok();
            buf
        });

        let exit = self.wait_for_exit(&mut child).await?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        match exit {
            ProcessExit::Finished(status) if status.success() => Ok(()),
            ProcessExit::Finished(status) => Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(stderr_text),
                status.code(),
            )),
            ProcessExit::Cancelled => {
                info!("FFmpeg run cancelled");
                Err(MediaError::Cancelled)
            }
            ProcessExit::TimedOut(secs) => {
                warn!("FFmpeg timed out after {} seconds", secs);
                Err(MediaError::Timeout(secs))
            }
        }
    }

    /// Wait for the child, honoring cancellation and timeout.
    async fn wait_for_exit(&self, child: &mut Child) -> MediaResult<ProcessExit> {
        let deadline = self
            .timeout_secs
            .map(|s| tokio::time::Instant::now() + Duration::from_secs(s));
        let mut cancel_rx = self.cancel_rx.clone();

        let exit = loop {
            tokio::select! {
                status = child.wait() => break ProcessExit::Finished(status?),
                cancelled = wait_for_cancel(&mut cancel_rx) => {
                    if cancelled {
                        break ProcessExit::Cancelled;
                    }
                }
                _ = sleep_until_opt(deadline) => {
                    break ProcessExit::TimedOut(self.timeout_secs.unwrap_or_default());
                }
            }
        };

        match exit {
            ProcessExit::Finished(_) => {}
            _ => terminate(child).await,
        }

        Ok(exit)
    }
}

/// Resolve when the cancel signal flips to true; pend forever without one.
async fn wait_for_cancel(rx: &mut Option<watch::Receiver<bool>>) -> bool {
    match rx {
        Some(rx) => {
            if *rx.borrow() {
                return true;
            }
            if rx.changed().await.is_err() {
                // Sender gone; no cancellation can arrive anymore.
                std::future::pending::<()>().await;
            }
            *rx.borrow()
        }
        None => std::future::pending().await,
    }
}

/// Sleep until the deadline; pend forever without one.
async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

/// Ask the encoder to stop, escalating to a hard kill after the grace period.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        if tokio::time::timeout(Duration::from_secs(TERMINATE_GRACE_SECS), child.wait())
            .await
            .is_ok()
        {
            return;
        }
        warn!("FFmpeg ignored SIGTERM, sending SIGKILL");
    }
    let _ = child.kill().await;
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

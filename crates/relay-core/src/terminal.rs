use crate::error::{RelayError, Result};
use std::process::Command;

// ---------------------------------------------------------------------------
// Terminal trait
// ---------------------------------------------------------------------------

/// The raw send/capture primitives the engine is built on.
///
/// Everything above this seam treats delivery as fire-and-forget and capture
/// as a snapshot of the most recent `max_lines` of output. Tests substitute
/// scripted implementations.
pub trait Terminal {
    /// Deliver `text` to the endpoint at `address`, submitting it as input.
    fn send(&self, address: &str, text: &str) -> Result<()>;

    /// Capture up to the most recent `max_lines` lines of visible output
    /// plus scrollback.
    fn capture(&self, address: &str, max_lines: u32) -> Result<String>;
}

// ---------------------------------------------------------------------------
// TmuxTerminal
// ---------------------------------------------------------------------------

/// tmux-backed terminal: `send-keys` for delivery, `capture-pane` for reads.
pub struct TmuxTerminal;

impl TmuxTerminal {
    fn run(&self, address: &str, args: &[&str]) -> Result<std::process::Output> {
        let output = Command::new("tmux").args(args).output().map_err(|e| {
            RelayError::SendFailed {
                target: address.to_string(),
                detail: format!("failed to invoke tmux: {e}"),
            }
        })?;
        Ok(output)
    }
}

impl Terminal for TmuxTerminal {
    fn send(&self, address: &str, text: &str) -> Result<()> {
        // -l sends the text literally; the second call submits it.
        let output = self.run(address, &["send-keys", "-t", address, "-l", text])?;
        if !output.status.success() {
            return Err(RelayError::SendFailed {
                target: address.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let enter = self.run(address, &["send-keys", "-t", address, "Enter"])?;
        if !enter.status.success() {
            return Err(RelayError::SendFailed {
                target: address.to_string(),
                detail: String::from_utf8_lossy(&enter.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn capture(&self, address: &str, max_lines: u32) -> Result<String> {
        let start = format!("-{max_lines}");
        let output = Command::new("tmux")
            .args(["capture-pane", "-p", "-t", address, "-S", &start])
            .output()
            .map_err(|e| RelayError::CaptureFailed {
                target: address.to_string(),
                detail: format!("failed to invoke tmux: {e}"),
            })?;
        if !output.status.success() {
            return Err(RelayError::CaptureFailed {
                target: address.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

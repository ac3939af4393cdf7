//! Desktop notifications for errors the bar itself cannot show.

use std::process::Command;

const NOTIFY_BIN: &str = "notify-send";

/// Send a desktop notification through `notify-send`.
///
/// Best-effort: a missing binary or a non-zero exit is logged and ignored.
pub fn notify_user(message: &str) {
    match Command::new(NOTIFY_BIN).arg("barcast").arg(message).status() {
        Ok(status) if status.success() => {
            tracing::debug!("Sent desktop notification");
        }
        Ok(status) => {
            tracing::warn!("{} exited with {}", NOTIFY_BIN, status);
        }
        Err(e) => {
            tracing::warn!("Failed to run {}: {}", NOTIFY_BIN, e);
        }
    }
}

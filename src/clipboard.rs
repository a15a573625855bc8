use tracing::{debug, warn};

use crate::{scheduler::WindowScheduler, OtpError};

/// Clipboard-write capability, provided by the embedding application.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), OtpError>;
}

/// User-notification capability (a toast, a status line, ...).
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Copies the current code to the clipboard in response to an explicit
/// user action, posting a notification either way.
///
/// Returns whether a code was copied. Clipboard failures are surfaced to
/// the user but never affect the scheduler state.
pub fn copy_current_code(
    scheduler: &WindowScheduler,
    clipboard: &mut dyn Clipboard,
    notifier: &mut dyn Notifier,
) -> bool {
    let Some(code) = scheduler.current_code() else {
        return false;
    };
    let text = code.to_string();

    match clipboard.write_text(&text) {
        Ok(()) => {
            debug!("code copied to clipboard");
            notifier.notify("Code copied to clipboard");
            true
        }
        Err(error) => {
            warn!(%error, "clipboard write failed");
            notifier.notify("Could not copy the code");
            false
        }
    }
}

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::{
    store::SecretStore, totp::Totp, OtpCode, OtpError, MAX_DIGITS, MAX_PERIOD, MIN_DIGITS,
};

/// Wall-clock time source, injected so the scheduler can be driven through
/// arbitrary timelines in tests.
pub trait Clock: Send + Sync {
    /// Seconds since the UNIX epoch
    fn now_unix(&self) -> u64;
}

/// The process-wide system clock. Saturates to 0 before the epoch.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

/// Callback invoked with every error the scheduler recovers from.
pub type ErrorHandler = Box<dyn FnMut(&OtpError) + Send>;

/// Scheduler state shared between the tick task and the callers mutating
/// the configuration. Locking the mutex for every operation keeps
/// reconfigurations atomic with respect to the tick stream.
pub type SharedScheduler = Arc<tokio::sync::Mutex<WindowScheduler>>;

#[derive(Debug, Clone, Copy)]
struct ActiveWindow {
    code: OtpCode,
    /// Absolute UNIX second at which the code stops being displayed.
    window_end: u64,
}

/// Owns the secret and the notion of the current time window, and decides
/// when the code engine must be re-invoked.
///
/// The scheduler is synchronous; [`crate::ticker::spawn_tick_task`] drives
/// [`Self::on_tick`] once per second. A fresh code is derived when the
/// secret, period, or digit count changes and when the active window
/// elapses, never otherwise.
pub struct WindowScheduler {
    clock: Arc<dyn Clock>,
    store: Box<dyn SecretStore>,
    error_handler: Option<ErrorHandler>,
    secret: String,
    period: u64,
    digits: u32,
    window: Option<ActiveWindow>,
}

impl WindowScheduler {
    /// Creates an idle scheduler with the default 30-second period and
    /// 6-digit codes. No code is derived until a secret arrives, either
    /// through [`Self::set_secret`] or [`Self::load_persisted`].
    pub fn new(clock: Arc<dyn Clock>, store: Box<dyn SecretStore>) -> Self {
        Self {
            clock,
            store,
            error_handler: None,
            secret: String::new(),
            period: 30,
            digits: 6,
            window: None,
        }
    }

    /// Registers the handler that receives recovered errors for
    /// presentation.
    pub fn on_error(&mut self, handler: impl FnMut(&OtpError) + Send + 'static) {
        self.error_handler = Some(Box::new(handler));
    }

    /// Applies the secret persisted by a previous session, if any.
    pub fn load_persisted(&mut self) {
        if let Some(secret) = self.store.load() {
            if !secret.is_empty() {
                debug!("loaded a persisted secret");
                self.secret = secret;
                self.reconfigure();
            }
        }
    }

    /// Replaces the secret wholesale. An empty value clears the current
    /// code and stops the countdown.
    pub fn set_secret(&mut self, value: impl Into<String>) {
        self.secret = value.into();
        self.reconfigure();
    }

    ///  Sets the period in seconds
    pub fn set_period(&mut self, seconds: u64) {
        self.period = seconds;
        self.reconfigure();
    }

    ///  Sets the number of digits to generate
    pub fn set_digits(&mut self, n: u32) {
        self.digits = n;
        self.reconfigure();
    }

    /// Immutable snapshot of the configured secret
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// The code currently valid for display, if any
    pub fn current_code(&self) -> Option<&OtpCode> {
        self.window.as_ref().map(|w| &w.code)
    }

    /// Seconds of validity left for the current code. Always within
    /// `0..=period`, recomputed from the clock on every call rather than
    /// from a decrement count.
    pub fn remaining_seconds(&self) -> u64 {
        match &self.window {
            Some(window) => {
                let now = self.clock.now_unix();
                window.window_end.saturating_sub(now).min(self.period)
            }
            None => 0,
        }
    }

    /// Advances the state machine by one observation of the clock.
    ///
    /// Re-derives the code exactly once when the active window has
    /// elapsed, and re-derives to resynchronize when the clock has moved
    /// backwards past the window start. Inert while no window is active,
    /// so a bad secret is not retried until the next reconfiguration.
    pub fn on_tick(&mut self) {
        let Some(window) = self.window else { return };
        let now = self.clock.now_unix();

        if now >= window.window_end {
            debug!(now, "time window elapsed");
            self.derive(now);
        } else if window.window_end - now > self.period {
            debug!(
                now,
                window_end = window.window_end,
                "clock moved backwards, resynchronizing"
            );
            self.derive(now);
        }
    }

    /// Reacts to a configuration change: validates the new parameters and
    /// derives a fresh code immediately, so the display never shows a code
    /// computed under superseded settings.
    fn reconfigure(&mut self) {
        self.window = None;

        if self.secret.is_empty() {
            debug!("no secret present, countdown idle");
            return;
        }

        if let Err(error) = self.validate_config() {
            self.report(error);
            return;
        }

        let now = self.clock.now_unix();
        self.derive(now);
    }

    fn validate_config(&self) -> Result<(), OtpError> {
        if self.period == 0 || self.period > MAX_PERIOD {
            return Err(OtpError::InvalidPeriod(self.period));
        }

        if self.digits < MIN_DIGITS || self.digits > MAX_DIGITS {
            return Err(OtpError::InvalidDigits(self.digits));
        }

        Ok(())
    }

    /// Invokes the code engine for the given timestamp and arms a full
    /// period of countdown. On failure the window is discarded so no stale
    /// code stays on display.
    fn derive(&mut self, now: u64) {
        let mut totp = Totp::new(self.secret.clone());
        totp.with_period(self.period).with_digits(self.digits);

        match totp.generate(now) {
            Ok(code) => {
                self.window = Some(ActiveWindow {
                    code,
                    window_end: now + self.period,
                });
                debug!(step = now / self.period, "derived a fresh code");

                if let Err(error) = self.store.save(&self.secret) {
                    self.report(error);
                }
            }
            Err(error) => {
                self.window = None;
                self.report(error);
            }
        }
    }

    fn report(&mut self, error: OtpError) {
        warn!(%error, "scheduler error");
        if let Some(handler) = self.error_handler.as_mut() {
            handler(&error);
        }
    }
}

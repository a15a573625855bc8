pub mod clipboard;
pub mod scheduler;
pub mod store;
pub mod ticker;
pub mod totp;

use std::fmt::Display;

pub use scheduler::{Clock, SystemClock, WindowScheduler};
pub use store::{FileSecretStore, MemorySecretStore, SecretStore};
pub use ticker::{spawn_tick_task, TickerConfig};
pub use totp::Totp;

/// Smallest accepted code length.
pub const MIN_DIGITS: u32 = 1;
/// Largest accepted code length. A truncated 31-bit value never exceeds
/// ten digits, so anything above this is pure zero padding anyway.
pub const MAX_DIGITS: u32 = 12;
/// Upper bound the scheduler accepts for a period, in seconds.
pub const MAX_PERIOD: u64 = 86_400;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Secret decode error")]
    SecretDecode(data_encoding::DecodeError),
    #[error("Invalid digest")]
    InvalidDigest(Vec<u8>),
    #[error("Invalid period, found {0}. Expected a positive number of seconds up to 86400")]
    InvalidPeriod(u64),
    #[error("Invalid digit count, found {0}. Expected a value between 1 and 12")]
    InvalidDigits(u32),
    #[error("Could not persist the secret")]
    SecretStore(#[source] std::io::Error),
    #[error("Could not write to the clipboard")]
    ClipboardWrite(#[source] std::io::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OtpCode {
    code: u64,
    digits: u32,
}

impl OtpCode {
    pub(crate) fn new(code: u64, digits: u32) -> Self {
        Self { code, digits }
    }

    pub fn integer(&self) -> u64 {
        self.code
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}

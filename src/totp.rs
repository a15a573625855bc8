use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::{OtpCode, OtpError, MAX_DIGITS, MIN_DIGITS};

type HmacSha1 = Hmac<Sha1>;

/// The code derivation engine: a pure mapping from
/// `(secret, period, digits, timestamp)` to a numeric code.
///
/// Holds no mutable state and performs no I/O; a single value can be
/// shared freely between callers.
#[derive(Debug, Clone, PartialEq)]
pub struct Totp {
    pub(crate) secret: String,
    pub(crate) period: u64,
    pub(crate) digits: u32,
}

impl Totp {
    /// Creates the config for the [Time-based One-time Password Algorithm](http://en.wikipedia.org/wiki/Time-based_One-time_Password_Algorithm)
    /// (TOTP) given an RFC4648 base32 encoded secret.
    ///
    /// Obs.: This method defaults to a 6-digit code and a period of 30 seconds
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            period: 30,
            digits: 6,
        }
    }

    ///  Sets the period in seconds
    pub fn with_period(&mut self, period: u64) -> &mut Self {
        self.period = period;

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    /// Generates a code from the provided seconds since the UNIX epoch,
    /// truncated to the configured number of digits.
    ///
    /// Fails with [`OtpError::SecretDecode`] when the secret is not valid
    /// base32, and with [`OtpError::InvalidPeriod`] /
    /// [`OtpError::InvalidDigits`] when the config is out of range.
    pub fn generate(&self, seconds_since_epoch: u64) -> Result<OtpCode, OtpError> {
        if self.period == 0 {
            return Err(OtpError::InvalidPeriod(self.period));
        }
        if self.digits < MIN_DIGITS || self.digits > MAX_DIGITS {
            return Err(OtpError::InvalidDigits(self.digits));
        }

        let calculated_time = seconds_since_epoch / self.period;

        let decoded = Self::decode_secret(self.secret.as_str())?;
        let digest = Self::calc_digest(decoded.as_slice(), calculated_time);

        let code = Self::encode_digest_truncated(digest.as_slice(), self.digits)?;

        Ok(OtpCode::new(code, self.digits))
    }

    /// The time step counter for the provided seconds since the UNIX epoch
    pub fn time_step(&self, seconds_since_epoch: u64) -> u64 {
        seconds_since_epoch / self.period
    }

    /// Seconds left until the time step of the provided timestamp elapses
    pub fn remaining_seconds(&self, seconds_since_epoch: u64) -> u64 {
        self.period - (seconds_since_epoch % self.period)
    }

    /// Decodes a secret (given as an RFC4648 base32-encoded ASCII string)
    /// into a byte string
    pub fn decode_secret(secret: &str) -> Result<Vec<u8>, OtpError> {
        data_encoding::BASE32_NOPAD
            .decode(secret.as_bytes())
            .map_err(OtpError::SecretDecode)
    }

    /// Calculates the HMAC-SHA1 digest of the counter encoded as a
    /// fixed-width big-endian byte sequence.
    fn calc_digest(decoded_secret: &[u8], counter: u64) -> Vec<u8> {
        // HMAC accepts keys of any length
        let mut mac = HmacSha1::new_from_slice(decoded_secret)
            .expect("HMAC key of any length is accepted");
        mac.update(&counter.to_be_bytes());

        mac.finalize().into_bytes().to_vec()
    }

    /// Encodes the HMAC digest into a truncated integer.
    fn encode_digest_truncated(digest: &[u8], target_digits_count: u32) -> Result<u64, OtpError> {
        // While sometimes this is a hardcoded 19
        // the last byte tells us the offset for any algorithm
        let offset = match digest.last() {
            Some(x) => *x & 0xf,
            None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        } as usize;

        // Gets the 4 bytes that will compose the code
        let code_bytes: [u8; 4] = match digest[offset..offset + 4].try_into() {
            Ok(x) => x,
            Err(_) => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        };

        let code = u32::from_be_bytes(code_bytes);
        let truncation_factor = u64::pow(10, target_digits_count);

        Ok(u64::from(code & 0x7fffffff) % truncation_factor)
    }
}

//! Delivery confirmation codes.
//!
//! A courier requests a code when standing at the door; the purchaser reads
//! it back from the SMS and the courier submits it to finish the delivery.

use core::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use super::lifecycle::OrderError;

/// How long an issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Smallest and largest codes that can be issued.
const CODE_RANGE: core::ops::RangeInclusive<u32> = 100_000..=999_999;

/// A six digit delivery confirmation code.
///
/// `Debug` never prints the digits so codes stay out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Draw a fresh code uniformly from `100000..=999999`.
    #[must_use]
    pub fn generate() -> Self {
        let value = rand::rng().random_range(CODE_RANGE);
        Self(value.to_string())
    }

    /// Rebuild a code read back from storage.
    ///
    /// Returns `None` unless the text is exactly six ASCII digits.
    #[must_use]
    pub fn from_stored(s: &str) -> Option<Self> {
        (s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())).then(|| Self(s.to_owned()))
    }

    /// The digits, for persistence and the SMS body.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact, case-sensitive comparison against an already trimmed submission.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        self.0 == submitted
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// An issued code together with the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOtp {
    pub code: OtpCode,
    pub expires_at: DateTime<Utc>,
}

impl PendingOtp {
    /// Mint a new code valid for [`OTP_TTL_MINUTES`] from `now`.
    #[must_use]
    pub fn issue(now: DateTime<Utc>) -> Self {
        Self {
            code: OtpCode::generate(),
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
        }
    }

    /// Pair stored columns back up. Either half missing means no code.
    #[must_use]
    pub fn from_columns(code: Option<&str>, expires_at: Option<DateTime<Utc>>) -> Option<Self> {
        Some(Self {
            code: OtpCode::from_stored(code?)?,
            expires_at: expires_at?,
        })
    }

    /// The expiry instant itself is already expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Normalize a submitted code from a JSON body.
///
/// Clients send the code either as a string or as a number; both are
/// coerced to text and trimmed.
///
/// # Errors
///
/// Returns `OrderError::OtpRequired` when the value is absent, null,
/// blank, or of any other JSON type.
pub fn normalize_submission(value: Option<&serde_json::Value>) -> Result<String, OrderError> {
    let text = match value {
        Some(serde_json::Value::String(s)) => s.trim().to_owned(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(OrderError::OtpRequired);
    }
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..1_000 {
            let code = OtpCode::generate();
            assert_eq!(code.as_str().len(), 6);
            let n: u32 = code.as_str().parse().unwrap();
            assert!(CODE_RANGE.contains(&n));
        }
    }

    #[test]
    fn test_debug_hides_digits() {
        let code = OtpCode::from_stored("482913").unwrap();
        assert!(!format!("{code:?}").contains("482913"));
    }

    #[test]
    fn test_from_stored_rejects_malformed() {
        assert!(OtpCode::from_stored("12345").is_none());
        assert!(OtpCode::from_stored("1234567").is_none());
        assert!(OtpCode::from_stored("12a456").is_none());
    }

    #[test]
    fn test_issue_sets_ten_minute_expiry() {
        let now = Utc::now();
        let otp = PendingOtp::issue(now);
        assert_eq!(otp.expires_at - now, Duration::minutes(10));
        assert!(!otp.is_expired(now));
        assert!(otp.is_expired(otp.expires_at));
    }

    #[test]
    fn test_from_columns_needs_both_halves() {
        let now = Utc::now();
        assert!(PendingOtp::from_columns(Some("111111"), Some(now)).is_some());
        assert!(PendingOtp::from_columns(Some("111111"), None).is_none());
        assert!(PendingOtp::from_columns(None, Some(now)).is_none());
    }

    #[test]
    fn test_normalize_submission() {
        assert_eq!(normalize_submission(Some(&json!(" 482913 "))).unwrap(), "482913");
        assert_eq!(normalize_submission(Some(&json!(482_913))).unwrap(), "482913");
        assert_eq!(normalize_submission(Some(&json!("   "))), Err(OrderError::OtpRequired));
        assert_eq!(normalize_submission(Some(&json!(null))), Err(OrderError::OtpRequired));
        assert_eq!(normalize_submission(None), Err(OrderError::OtpRequired));
    }
}

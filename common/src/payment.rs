use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::identity::UserId;
use crate::offer::OfferId;

/// A money amount in minor units (cents).
///
/// The backend's wire format is a decimal string ("80.00"), so that is the
/// serialized form; all arithmetic stays in integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(cents: u64) -> Amount {
        Amount(cents)
    }

    pub fn minor(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Apply an integer percent discount, rounding down to the cent.
    pub fn apply_discount_percent(self, percent: u8) -> Amount {
        let percent = u64::from(percent.min(100));
        Amount(self.0 - self.0 * percent / 100)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl From<Amount> for String {
    fn from(a: Amount) -> String {
        a.to_string()
    }
}

impl TryFrom<String> for Amount {
    type Error = ParseAmountError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Error parsing a decimal amount string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAmountError(String);

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid amount: {:?}", self.0)
    }
}

impl std::error::Error for ParseAmountError {}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Accepts "123.45", "123.4" and whole-number forms like "123".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseAmountError(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || whole.chars().any(|c| !c.is_ascii_digit()) {
            return Err(bad());
        }
        if frac.len() > 2 || frac.chars().any(|c| !c.is_ascii_digit()) {
            return Err(bad());
        }
        let dollars: u64 = whole.parse().map_err(|_| bad())?;
        let cents: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| bad())? * 10,
            _ => frac.parse().map_err(|_| bad())?,
        };
        dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .map(Amount)
            .ok_or_else(bad)
    }
}

/// Order parameters persisted to durable client storage before the
/// full-page redirect to the payment provider, and read back on the
/// success route to create the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCheckout {
    /// Client-generated reference carried through the redirect; the success
    /// handler looks an order up by this before creating one.
    pub order_ref: String,
    pub offer_id: OfferId,
    pub conversation_id: ConversationId,
    pub student: UserId,
    pub developer: UserId,
    pub description: String,
    pub amount: Amount,
    pub delivery_days: u32,
    pub revisions: u32,
    pub meeting_included: bool,
    pub created_at: DateTime<Utc>,
}

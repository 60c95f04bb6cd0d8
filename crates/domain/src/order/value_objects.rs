//! Value objects for the order domain.

use chrono::{DateTime, Utc};
use common::{AddressId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderError;

/// Money amount represented in minor units (cents) to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, returning `None` on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Shipping address as entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub receiver: String,
    pub mobile: String,
    pub province: String,
    pub city: String,
    pub area: String,
    /// Street, building and door number.
    pub detail: String,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl AddressInput {
    /// Checks that the fields needed to deliver the order are filled in.
    pub fn validate(&self) -> Result<(), OrderError> {
        let required = [
            ("receiver", &self.receiver),
            ("mobile", &self.mobile),
            ("detail", &self.detail),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(OrderError::MissingAddressField(name));
            }
        }
        Ok(())
    }
}

/// Address copied under the user at submission time.
///
/// Later edits to the user's address book never reach a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub id: AddressId,
    pub user_id: UserId,
    pub address: AddressInput,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> AddressInput {
        AddressInput {
            receiver: "Li Lei".to_string(),
            mobile: "13800000000".to_string(),
            province: "Zhejiang".to_string(),
            city: "Hangzhou".to_string(),
            area: "Xihu".to_string(),
            detail: "No. 1 Wensan Road".to_string(),
            postal_code: None,
        }
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(2500).to_string(), "25.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn test_money_multiply_and_add() {
        let line_a = Money::from_cents(1000).checked_multiply(2).unwrap();
        let line_b = Money::from_cents(500).checked_multiply(1).unwrap();
        assert_eq!(line_a.cents(), 2000);
        assert_eq!(line_a.checked_add(line_b), Some(Money::from_cents(2500)));
    }

    #[test]
    fn test_money_overflow_is_none() {
        assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply(3), None);
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(i64::MAX).checked_multiply(1),
            Some(Money::from_cents(i64::MAX))
        );
    }

    #[test]
    fn test_money_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(999)).unwrap();
        assert_eq!(json, "999");
    }

    #[test]
    fn test_address_validation() {
        assert!(address().validate().is_ok());

        let mut blank = address();
        blank.detail = "  ".to_string();
        assert_eq!(
            blank.validate(),
            Err(OrderError::MissingAddressField("detail"))
        );
    }
}

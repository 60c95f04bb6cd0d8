//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of a persisted order.
///
/// State transitions:
/// ```text
/// Unpaid ──► Paid ──► Shipped ──► Completed
///   │         │
///   └─────────┴──► Cancelled
/// ```
///
/// Submission only ever writes `Unpaid`, and its compensation only ever moves
/// `Unpaid` to `Cancelled`. The remaining transitions belong to payment and
/// fulfilment subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order recorded, awaiting payment.
    #[default]
    Unpaid,

    /// Payment confirmed.
    Paid,

    /// Handed over to shipping.
    Shipped,

    /// Delivered and closed (terminal state).
    Completed,

    /// Cancelled, either by the user or by submission compensation (terminal state).
    Cancelled,
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl OrderStatus {
    /// Returns true if the order can be paid in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Unpaid)
    }

    /// Returns true if the order can be shipped in this status.
    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns true if the order can be completed in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Unpaid | OrderStatus::Paid)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the persisted representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Unpaid => "UNPAID",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNPAID" => Ok(OrderStatus::Unpaid),
            "PAID" => Ok(OrderStatus::Paid),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_unpaid() {
        assert_eq!(OrderStatus::default(), OrderStatus::Unpaid);
    }

    #[test]
    fn test_only_unpaid_and_paid_can_cancel() {
        assert!(OrderStatus::Unpaid.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Completed.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_forward_transitions() {
        assert!(OrderStatus::Unpaid.can_pay());
        assert!(!OrderStatus::Paid.can_pay());
        assert!(OrderStatus::Paid.can_ship());
        assert!(!OrderStatus::Unpaid.can_ship());
        assert!(OrderStatus::Shipped.can_complete());
        assert!(!OrderStatus::Paid.can_complete());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Unpaid.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_matches_display() {
        for status in [
            OrderStatus::Unpaid,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
        assert!("UNKNOWN".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serializes_as_screaming_case() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
    }
}

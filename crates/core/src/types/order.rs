//! Order status and payment method enums.

use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// Status only moves forward: `Pending → Shipped → Delivered`. The backend
/// is the authority on transitions; [`OrderStatus::can_advance_to`] mirrors
/// its table so invalid requests can be rejected before they are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// All statuses, in forward order. Useful for rendering a status picker.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Shipped, Self::Delivered];

    /// Whether an order in this status may move to `next`.
    ///
    /// Backward and self transitions are never allowed.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Shipped) | (Self::Shipped, Self::Delivered)
        )
    }

    /// Whether this is a terminal status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Shipped => write!(f, "Shipped"),
            Self::Delivered => write!(f, "Delivered"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            _ => Err(format!("unrecognized order status: {s}")),
        }
    }
}

/// How an order is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery, resolved synchronously without leaving the app.
    Cod,
    /// Online payment via a processor-hosted page (external redirect).
    Online,
}

impl PaymentMethod {
    /// Wire name used in order-creation endpoints.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cod => "cod",
            Self::Online => "online",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(OrderStatus::Pending.can_advance_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_advance_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_backward_and_self_transitions_rejected() {
        use OrderStatus::{Delivered, Pending, Shipped};

        for status in OrderStatus::ALL {
            assert!(!status.can_advance_to(status), "{status} -> {status}");
        }
        assert!(!Shipped.can_advance_to(Pending));
        assert!(!Delivered.can_advance_to(Pending));
        assert!(!Delivered.can_advance_to(Shipped));
        // Skipping a stage is also not allowed
        assert!(!Pending.can_advance_to(Delivered));
    }

    #[test]
    fn test_delivered_is_terminal() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_status_wire_names_match_backend() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Shipped).expect("serialize"),
            "\"Shipped\""
        );
        let status: OrderStatus = "Delivered".parse().expect("parse");
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(PaymentMethod::Cod.as_str(), "cod");
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Online).expect("serialize"),
            "\"online\""
        );
    }
}

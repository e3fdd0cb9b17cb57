//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `OrderId` where a
//! `BatchId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(OrderId, "Unique identifier for a sales or purchase order.");
typed_id!(OrderLineId, "Unique identifier for an order line.");
typed_id!(PaymentEntryId, "Unique identifier for a payment ledger entry.");
typed_id!(ProductId, "Unique identifier for a product.");
typed_id!(BatchId, "Unique identifier for an inventory batch.");
typed_id!(CounterpartyId, "Unique identifier for a customer or supplier.");
typed_id!(RefundTransactionId, "Unique identifier for a refund transaction.");
typed_id!(RefundLineId, "Unique identifier for a refund line.");
typed_id!(
    InventoryTransactionId,
    "Unique identifier for an inventory audit transaction."
);
typed_id!(
    FinancialTransactionId,
    "Unique identifier for a financial mirror transaction."
);
typed_id!(UserId, "Unique identifier for an acting user.");

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_typed_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = OrderId::from_uuid(uuid);
        assert_eq!(id.into_inner(), uuid);
    }

    #[test]
    fn test_typed_id_display_roundtrip() {
        let id = BatchId::new();
        let parsed = BatchId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_typed_id_from_str_error() {
        assert!(OrderId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_typed_id_serde_transparent() {
        let id = ProductId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}

use serde::{Deserialize, Serialize};

/// Error returned when an identifier cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

impl std::fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.input)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw numeric identifier.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self).map_err(|_| ParseIdError {
                    kind: $kind,
                    input: s.to_string(),
                })
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of a submitted order.
    ///
    /// Allocated exactly once per submission attempt and never reused,
    /// even when the submission later fails.
    OrderId,
    "order id"
);

numeric_id!(
    /// Identifier of the user placing an order.
    UserId,
    "user id"
);

numeric_id!(
    /// Catalog product identifier.
    ProductId,
    "product id"
);

numeric_id!(
    /// Catalog SKU identifier (a purchasable variant of a product).
    SkuId,
    "sku id"
);

numeric_id!(
    /// Identifier of a line in a user's cart.
    CartLineId,
    "cart line id"
);

numeric_id!(
    /// Identifier of a stored shipping-address snapshot.
    AddressId,
    "address id"
);

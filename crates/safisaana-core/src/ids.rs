//! Identifier types for the marketplace.
//!
//! User ids come from the authentication provider and are opaque strings.
//! Catalogue ids (products, pricing items) are generated here as ULIDs so that
//! listing them in key order is also listing them in creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Errors produced when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier was empty or whitespace.
    #[error("identifier is empty")]
    Empty,

    /// A correlation reference did not have the `user_product_millis` shape.
    #[error("malformed correlation reference: {0}")]
    MalformedReference(String),
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(IdError::Empty);
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// A buyer identifier issued by the authentication provider.
    UserId
}

string_id! {
    /// A catalogue product identifier.
    ProductId
}

string_id! {
    /// A pricing-plan identifier.
    PricingId
}

string_id! {
    /// The gateway-assigned invoice id (or, failing that, the API reference)
    /// that keys a payment record.
    InvoiceId
}

impl ProductId {
    /// Generate a new time-ordered product id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }
}

impl PricingId {
    /// Generate a new time-ordered pricing id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }
}

/// Document key of the purchase record for a buyer/product pair.
#[must_use]
pub fn purchase_key(user_id: &UserId, product_id: &ProductId) -> String {
    format!("{user_id}_{product_id}")
}

/// The reference sent to the gateway as `api_ref` when a checkout is opened for a
/// known buyer and product.
///
/// Format: `{user_id}_{product_id}_{unix_millis}`. Parsing splits from the right,
/// so user ids may contain `_` but product ids may not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationRef {
    /// The buyer.
    pub user_id: UserId,
    /// The product being bought.
    pub product_id: ProductId,
    /// Checkout creation time in milliseconds since the Unix epoch.
    pub created_millis: i64,
}

impl CorrelationRef {
    /// Build a reference stamped with the current time.
    #[must_use]
    pub fn now(user_id: UserId, product_id: ProductId) -> Self {
        Self {
            user_id,
            product_id,
            created_millis: chrono::Utc::now().timestamp_millis(),
        }
    }
}

impl fmt::Display for CorrelationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.user_id, self.product_id, self.created_millis
        )
    }
}

impl FromStr for CorrelationRef {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IdError::MalformedReference(s.to_string());

        let mut parts = s.rsplitn(3, '_');
        let millis = parts.next().ok_or_else(malformed)?;
        let product = parts.next().ok_or_else(malformed)?;
        let user = parts.next().ok_or_else(malformed)?;

        let created_millis = millis.parse::<i64>().map_err(|_| malformed())?;

        Ok(Self {
            user_id: user.parse().map_err(|_| malformed())?,
            product_id: product.parse().map_err(|_| malformed())?,
            created_millis,
        })
    }
}

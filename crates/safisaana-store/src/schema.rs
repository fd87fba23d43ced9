//! Collection definitions.
//!
//! Every backend addresses documents by `(collection, key)`. `RocksDB` maps each
//! collection to a column family; PostgreSQL stores the name in a column.

use std::fmt;

/// Collection names.
pub mod cf {
    /// Payment records, keyed by invoice id.
    pub const PAYMENTS: &str = "payments";

    /// Purchase records, keyed by `{user_id}_{product_id}`.
    pub const PURCHASES: &str = "purchases";

    /// Catalogue products, keyed by product id (ULID).
    pub const PRODUCTS: &str = "products";

    /// Pricing plans, keyed by pricing id (ULID).
    pub const PRICING: &str = "pricing";

    /// Admin markers, keyed by user id. The value is informational only;
    /// presence is what grants admin access.
    pub const ADMINS: &str = "admins";
}

/// A document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// See [`cf::PAYMENTS`].
    Payments,
    /// See [`cf::PURCHASES`].
    Purchases,
    /// See [`cf::PRODUCTS`].
    Products,
    /// See [`cf::PRICING`].
    Pricing,
    /// See [`cf::ADMINS`].
    Admins,
}

impl Collection {
    /// All collections, for backend initialisation.
    pub const ALL: [Collection; 5] = [
        Self::Payments,
        Self::Purchases,
        Self::Products,
        Self::Pricing,
        Self::Admins,
    ];

    /// Storage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Payments => cf::PAYMENTS,
            Self::Purchases => cf::PURCHASES,
            Self::Products => cf::PRODUCTS,
            Self::Pricing => cf::PRICING,
            Self::Admins => cf::ADMINS,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns all collection names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    Collection::ALL.iter().map(|c| c.name()).collect()
}

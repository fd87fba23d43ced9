//! Ownership queries.
//!
//! A user owns a product exactly when the purchase record for the pair exists
//! and its status is `completed`.

use safisaana_core::{ProductId, UserId};

use crate::error::Result;
use crate::Store;

/// Whether `user_id` owns `product_id`.
///
/// Blank or malformed identifiers never own anything; they are not an error.
///
/// # Errors
///
/// Returns an error if the store lookup fails.
pub async fn user_owns_product(store: &dyn Store, user_id: &str, product_id: &str) -> Result<bool> {
    let (Ok(user_id), Ok(product_id)) = (user_id.parse::<UserId>(), product_id.parse::<ProductId>())
    else {
        return Ok(false);
    };

    Ok(store
        .get_purchase(&user_id, &product_id)
        .await?
        .is_some_and(|purchase| {
            purchase.user_id == user_id
                && purchase.product_id == product_id
                && purchase.grants_access()
        }))
}

/// Ids of every product `user_id` owns.
///
/// # Errors
///
/// Returns an error if the store lookup fails.
pub async fn owned_product_ids(store: &dyn Store, user_id: &UserId) -> Result<Vec<ProductId>> {
    Ok(store
        .list_purchases_by_user(user_id)
        .await?
        .into_iter()
        .filter(|purchase| purchase.grants_access())
        .map(|purchase| purchase.product_id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use rust_decimal_macros::dec;
    use safisaana_core::{PurchaseRecord, PurchaseStatus};

    async fn seed(store: &MemoryStore, user: &str, product: &str, status: PurchaseStatus) {
        let mut purchase = PurchaseRecord::completed(
            user.parse().unwrap(),
            product.parse().unwrap(),
            "Guide",
            dec!(10),
            "KES",
            "INV1".parse().unwrap(),
        );
        purchase.status = status;
        store.upsert_purchase(&purchase).await.unwrap();
    }

    #[tokio::test]
    async fn completed_purchase_grants_ownership() {
        let store = MemoryStore::new();
        seed(&store, "u1", "p1", PurchaseStatus::Completed).await;
        assert!(user_owns_product(&store, "u1", "p1").await.unwrap());
    }

    #[tokio::test]
    async fn no_record_means_not_owned() {
        let store = MemoryStore::new();
        seed(&store, "u1", "p1", PurchaseStatus::Completed).await;
        assert!(!user_owns_product(&store, "u1", "p2").await.unwrap());
        assert!(!user_owns_product(&store, "u2", "p1").await.unwrap());
    }

    #[tokio::test]
    async fn non_completed_status_is_not_owned() {
        let store = MemoryStore::new();
        seed(&store, "u1", "p1", PurchaseStatus::Pending).await;
        seed(&store, "u1", "p2", PurchaseStatus::Failed).await;
        assert!(!user_owns_product(&store, "u1", "p1").await.unwrap());
        assert!(!user_owns_product(&store, "u1", "p2").await.unwrap());
    }

    #[tokio::test]
    async fn blank_identifiers_are_not_owned() {
        let store = MemoryStore::new();
        seed(&store, "u1", "p1", PurchaseStatus::Completed).await;
        assert!(!user_owns_product(&store, "", "p1").await.unwrap());
        assert!(!user_owns_product(&store, "u1", "  ").await.unwrap());
    }

    #[tokio::test]
    async fn colliding_keys_do_not_grant_ownership() {
        let store = MemoryStore::new();
        seed(&store, "a_b", "c", PurchaseStatus::Completed).await;

        assert!(user_owns_product(&store, "a_b", "c").await.unwrap());
        assert!(!user_owns_product(&store, "a", "b_c").await.unwrap());

        let user: UserId = "a".parse().unwrap();
        let product: ProductId = "b_c".parse().unwrap();
        assert!(store.get_purchase(&user, &product).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_only_completed_products() {
        let store = MemoryStore::new();
        seed(&store, "u1", "p1", PurchaseStatus::Completed).await;
        seed(&store, "u1", "p2", PurchaseStatus::Pending).await;
        seed(&store, "u2", "p3", PurchaseStatus::Completed).await;

        let user: UserId = "u1".parse().unwrap();
        let owned = owned_product_ids(&store, &user).await.unwrap();
        assert_eq!(owned, vec!["p1".parse::<ProductId>().unwrap()]);
    }
}

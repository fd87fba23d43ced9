//! Document keys and the merge rule shared by every backend.

use serde_json::Value;

use safisaana_core::{purchase_key, InvoiceId, PricingId, ProductId, UserId};

/// Key of a payment record.
#[must_use]
pub fn payment_key(invoice_id: &InvoiceId) -> &str {
    invoice_id.as_str()
}

/// Key of a purchase record: `{user_id}_{product_id}`.
#[must_use]
pub fn purchase_record_key(user_id: &UserId, product_id: &ProductId) -> String {
    purchase_key(user_id, product_id)
}

/// Key of a product.
#[must_use]
pub fn product_key(product_id: &ProductId) -> &str {
    product_id.as_str()
}

/// Key of a pricing plan.
#[must_use]
pub fn pricing_key(pricing_id: &PricingId) -> &str {
    pricing_id.as_str()
}

/// Key of an admin marker.
#[must_use]
pub fn admin_key(user_id: &UserId) -> &str {
    user_id.as_str()
}

/// Merge `patch` into `target` field by field.
///
/// Top-level fields present in `patch` replace those in `target`; fields absent
/// from `patch` are kept. A non-object on either side replaces the target
/// wholesale. This matches PostgreSQL's `jsonb || jsonb`.
pub fn merge_fields(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (field, value) in incoming {
                existing.insert(field, value);
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn purchase_key_format() {
        let user: UserId = "u1".parse().unwrap();
        let product: ProductId = "p1".parse().unwrap();
        assert_eq!(purchase_record_key(&user, &product), "u1_p1");
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut doc = json!({ "status": "PENDING", "mpesa_reference": "QWE", "amount": "10" });
        merge_fields(&mut doc, json!({ "status": "COMPLETE", "amount": "12" }));
        assert_eq!(
            doc,
            json!({ "status": "COMPLETE", "mpesa_reference": "QWE", "amount": "12" })
        );
    }

    #[test]
    fn merge_is_shallow() {
        let mut doc = json!({ "raw_payload": { "a": 1, "b": 2 } });
        merge_fields(&mut doc, json!({ "raw_payload": { "c": 3 } }));
        assert_eq!(doc, json!({ "raw_payload": { "c": 3 } }));
    }

    #[test]
    fn merge_into_non_object_replaces() {
        let mut doc = Value::Null;
        merge_fields(&mut doc, json!({ "x": 1 }));
        assert_eq!(doc, json!({ "x": 1 }));
    }
}

//! Pricing plans shown on the pricing page.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::PricingId;
use crate::product::{validate_price, validate_title, ProductType};

/// Whether a plan sells one product or a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingType {
    /// A single product.
    Product,
    /// Several products together.
    Bundle,
}

/// A pricing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingItem {
    /// Plan id.
    pub id: PricingId,
    /// Display name.
    pub name: String,
    /// Single product or bundle.
    #[serde(rename = "type")]
    pub pricing_type: PricingType,
    /// Kind of product the plan covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    /// Current price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Price before discount, shown struck through.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub original_price: Option<Decimal>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Feature bullet points.
    #[serde(default)]
    pub features: Vec<String>,
    /// What a bundle includes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    /// External payment link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    /// Highlighted as the recommended plan.
    #[serde(default)]
    pub popular: bool,
    /// Shown on the public pricing page.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Admin form for creating a plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingInput {
    /// Display name.
    pub name: String,
    /// Single product or bundle.
    #[serde(rename = "type")]
    pub pricing_type: PricingType,
    /// Kind of product the plan covers.
    #[serde(default)]
    pub product_type: Option<ProductType>,
    /// Current price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Price before discount.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Feature bullet points.
    #[serde(default)]
    pub features: Vec<String>,
    /// What a bundle includes.
    #[serde(default)]
    pub includes: Vec<String>,
    /// External payment link.
    #[serde(default)]
    pub payment_link: Option<String>,
    /// Highlighted plan.
    #[serde(default)]
    pub popular: bool,
    /// Shown publicly.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl PricingInput {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidField` for a blank name or a negative price.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.name).map_err(|_| CoreError::field("name", "must not be empty"))?;
        validate_price(self.price)?;
        if let Some(original) = self.original_price {
            validate_price(original)
                .map_err(|_| CoreError::field("originalPrice", "must not be negative"))?;
        }
        Ok(())
    }

    /// Turn the form into a stored plan with a fresh id.
    #[must_use]
    pub fn into_item(self, now: DateTime<Utc>) -> PricingItem {
        PricingItem {
            id: PricingId::generate(),
            name: self.name.trim().to_string(),
            pricing_type: self.pricing_type,
            product_type: self.product_type,
            price: self.price,
            original_price: self.original_price,
            description: self.description,
            features: self.features,
            includes: self.includes,
            payment_link: self.payment_link.filter(|l| !l.trim().is_empty()),
            popular: self.popular,
            active: self.active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Admin form for a partial plan update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingUpdate {
    /// New name.
    pub name: Option<String>,
    /// New plan type.
    #[serde(rename = "type")]
    pub pricing_type: Option<PricingType>,
    /// New product type.
    pub product_type: Option<ProductType>,
    /// New price.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// New original price.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    /// New description.
    pub description: Option<String>,
    /// New features.
    pub features: Option<Vec<String>>,
    /// New includes; an empty list clears them.
    pub includes: Option<Vec<String>>,
    /// New payment link; an empty string clears it.
    pub payment_link: Option<String>,
    /// New popular flag.
    pub popular: Option<bool>,
    /// New active flag.
    pub active: Option<bool>,
}

impl PricingUpdate {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidField` for a blank name or a negative price.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(name) = &self.name {
            validate_title(name).map_err(|_| CoreError::field("name", "must not be empty"))?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(original) = self.original_price {
            validate_price(original)
                .map_err(|_| CoreError::field("originalPrice", "must not be negative"))?;
        }
        Ok(())
    }

    /// Apply the update and bump `updated_at`.
    pub fn apply(self, item: &mut PricingItem, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            item.name = name.trim().to_string();
        }
        if let Some(pricing_type) = self.pricing_type {
            item.pricing_type = pricing_type;
        }
        if self.product_type.is_some() {
            item.product_type = self.product_type;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if self.original_price.is_some() {
            item.original_price = self.original_price;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(features) = self.features {
            item.features = features;
        }
        if let Some(includes) = self.includes {
            item.includes = includes;
        }
        if let Some(link) = self.payment_link {
            item.payment_link = Some(link).filter(|l| !l.trim().is_empty());
        }
        if let Some(popular) = self.popular {
            item.popular = popular;
        }
        if let Some(active) = self.active {
            item.active = active;
        }
        item.updated_at = now;
    }
}

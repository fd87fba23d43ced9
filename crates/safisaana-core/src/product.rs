//! Catalogue products: plugins, e-books and courses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::ids::ProductId;

/// Kind of digital good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Software plugin.
    Plugin,
    /// E-book.
    Ebook,
    /// Video course.
    Course,
}

impl ProductType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plugin => "plugin",
            Self::Ebook => "ebook",
            Self::Course => "course",
        }
    }
}

impl FromStr for ProductType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plugin" => Ok(Self::Plugin),
            "ebook" => Ok(Self::Ebook),
            "course" => Ok(Self::Course),
            other => Err(CoreError::field(
                "type",
                format!("unknown product type '{other}'"),
            )),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalogue product, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product id.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Kind of product.
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// List price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: String,
    /// Download or course link; only handed to owners.
    #[serde(default)]
    pub file_url: String,
    /// One-line summary.
    #[serde(default)]
    pub short_description: String,
    /// Full description.
    #[serde(default)]
    pub description: String,
    /// External payment link, when the product is sold off-site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Storefront view of a product: everything except the file link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProduct {
    /// Product id.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Kind of product.
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// List price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Cover image URL.
    pub image_url: String,
    /// One-line summary.
    pub short_description: String,
    /// Full description.
    pub description: String,
    /// External payment link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for PublicProduct {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            title: p.title,
            product_type: p.product_type,
            price: p.price,
            image_url: p.image_url,
            short_description: p.short_description,
            description: p.description,
            payment_link: p.payment_link,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Admin form for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    /// Display title.
    pub title: String,
    /// Kind of product.
    #[serde(rename = "type")]
    pub product_type: ProductType,
    /// List price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Cover image URL.
    #[serde(default)]
    pub image_url: String,
    /// Download or course link.
    #[serde(default)]
    pub file_url: String,
    /// One-line summary.
    #[serde(default)]
    pub short_description: String,
    /// Full description.
    #[serde(default)]
    pub description: String,
    /// External payment link.
    #[serde(default)]
    pub payment_link: Option<String>,
}

impl ProductInput {
    /// Check the form.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidField` for a blank title or negative price.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.title)?;
        validate_price(self.price)
    }

    /// Turn the form into a stored product with a fresh id.
    #[must_use]
    pub fn into_product(self, now: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::generate(),
            title: self.title.trim().to_string(),
            product_type: self.product_type,
            price: self.price,
            image_url: self.image_url,
            file_url: self.file_url,
            short_description: self.short_description,
            description: self.description,
            payment_link: self.payment_link.filter(|l| !l.trim().is_empty()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Admin form for a partial product update. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    /// New title.
    pub title: Option<String>,
    /// New product type.
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    /// New price.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// New image URL.
    pub image_url: Option<String>,
    /// New file link.
    pub file_url: Option<String>,
    /// New summary.
    pub short_description: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New payment link; an empty string clears it.
    pub payment_link: Option<String>,
}

impl ProductUpdate {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// `CoreError::InvalidField` for a blank title or negative price.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Apply the update to a product and bump its `updated_at`.
    pub fn apply(self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            product.title = title.trim().to_string();
        }
        if let Some(product_type) = self.product_type {
            product.product_type = product_type;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = image_url;
        }
        if let Some(file_url) = self.file_url {
            product.file_url = file_url;
        }
        if let Some(short_description) = self.short_description {
            product.short_description = short_description;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(link) = self.payment_link {
            product.payment_link = Some(link).filter(|l| !l.trim().is_empty());
        }
        product.updated_at = now;
    }
}

pub(crate) fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::field("title", "must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_price(price: Decimal) -> Result<(), CoreError> {
    if price < Decimal::ZERO {
        return Err(CoreError::field("price", "must not be negative"));
    }
    Ok(())
}

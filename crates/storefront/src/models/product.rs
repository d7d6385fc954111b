//! Product domain types and boundary validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supermarket_core::{Money, ProductId};

/// Longest accepted product name or category.
pub const MAX_LABEL_LENGTH: usize = 200;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: Money,
    /// Units on hand. Never negative.
    pub stock: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit can be ordered.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Listing filter. Both criteria are optional and combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub name_contains: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}

impl ProductFilter {
    /// Build a filter from raw query-string values, dropping blanks.
    #[must_use]
    pub fn from_query(q: Option<&str>, category: Option<&str>) -> Self {
        let clean = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Self {
            name_contains: clean(q),
            category: clean(category),
        }
    }

    /// Whether `product` passes this filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let name_ok = self.name_contains.as_ref().is_none_or(|needle| {
            product
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let category_ok = self
            .category
            .as_ref()
            .is_none_or(|c| product.category == *c);
        name_ok && category_ok
    }
}

/// Raw product fields as submitted by the admin form or a seed file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub image_url: String,
}

impl From<&Product> for ProductInput {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            price: product.price.amount().to_string(),
            stock: product.stock.to_string(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }
}

/// A validated set of product fields, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: Money,
    pub stock: i32,
    pub image_url: Option<String>,
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field error found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.summary())]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Whether `field` has an error.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// One-line rendering: `"name: is required; price: must be greater than zero"`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl ProductDraft {
    /// Validate raw input.
    ///
    /// Name and category must be non-empty after trimming, price must be a
    /// positive amount, stock a whole number of zero or more. Description and
    /// image are optional.
    ///
    /// # Errors
    ///
    /// Returns every failing field at once.
    pub fn validate(input: &ProductInput) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = input.name.trim();
        if name.is_empty() {
            errors.push("name", "is required");
        } else if name.chars().count() > MAX_LABEL_LENGTH {
            errors.push("name", format!("must be at most {MAX_LABEL_LENGTH} characters"));
        }

        let category = input.category.trim();
        if category.is_empty() {
            errors.push("category", "is required");
        } else if category.chars().count() > MAX_LABEL_LENGTH {
            errors.push(
                "category",
                format!("must be at most {MAX_LABEL_LENGTH} characters"),
            );
        }

        let price = match Money::parse(&input.price) {
            Ok(price) if price.is_zero() => {
                errors.push("price", "must be greater than zero");
                None
            }
            Ok(price) => Some(price),
            Err(e) => {
                errors.push("price", e.to_string());
                None
            }
        };

        let stock_raw = input.stock.trim();
        let stock = if stock_raw.is_empty() {
            Some(0)
        } else {
            match stock_raw.parse::<i32>() {
                Ok(n) if n >= 0 => Some(n),
                Ok(_) => {
                    errors.push("stock", "cannot be negative");
                    None
                }
                Err(_) => {
                    errors.push("stock", "must be a whole number");
                    None
                }
            }
        };

        let image_url = Some(input.image_url.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        if let Some(url) = &image_url
            && !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/'))
        {
            errors.push("image_url", "must be an http(s) URL or a site path");
        }

        match (price, stock) {
            (Some(price), Some(stock)) if errors.errors.is_empty() => Ok(Self {
                name: name.to_owned(),
                category: category.to_owned(),
                description: input.description.trim().to_owned(),
                price,
                stock,
                image_url,
            }),
            _ => Err(errors),
        }
    }
}

//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Bananas
//!     category: Fruit
//!     price: "0.25"
//!     stock: 120
//! ```
//!
//! Prices are strings so they never pass through a float. Products whose
//! name already exists in the catalog are skipped, so seeding twice is safe.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use supermarket_storefront::db::Storage;
use supermarket_storefront::models::{ProductDraft, ProductFilter, ProductInput};
use supermarket_storefront::services::{CatalogError, CatalogService};

use super::connect;

/// Only bounds checkout row locks, which seeding never takes.
const SEED_LOCK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Top-level layout of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<SeedProduct> for ProductInput {
    fn from(seed: SeedProduct) -> Self {
        Self {
            name: seed.name,
            category: seed.category,
            description: seed.description,
            price: seed.price,
            stock: seed.stock.to_string(),
            image_url: seed.image_url.unwrap_or_default(),
        }
    }
}

/// Parse a seed file and validate every entry.
///
/// Returns the inputs in file order, or one message per invalid entry.
pub fn parse(content: &str) -> Result<Vec<ProductInput>, Box<dyn std::error::Error>> {
    let file: SeedFile = serde_yaml::from_str(content)?;

    let inputs: Vec<ProductInput> = file.products.into_iter().map(Into::into).collect();
    let errors: Vec<String> = inputs
        .iter()
        .filter_map(|input| {
            ProductDraft::validate(input)
                .err()
                .map(|e| format!("{}: {e}", input.name))
        })
        .collect();

    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} invalid products", errors.len()).into());
    }

    Ok(inputs)
}

/// Seed products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, any entry is invalid,
/// or a database operation fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Validate before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let inputs = parse(&content)?;
    info!(products = inputs.len(), "Seed file validated");

    let storage = Storage::postgres(connect().await?, SEED_LOCK_TIMEOUT);
    let catalog = CatalogService::new(&storage);

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for input in &inputs {
        let filter = ProductFilter::from_query(Some(&input.name), None);
        let exists = catalog
            .list(&filter)
            .await?
            .iter()
            .any(|p| p.name == input.name.trim());
        if exists {
            skipped += 1;
            continue;
        }

        match catalog.create(input).await {
            Ok(_) => inserted += 1,
            Err(CatalogError::Invalid(e)) => return Err(format!("{}: {e}", input.name).into()),
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_seed_file_is_valid() {
        let inputs = parse(include_str!("../../seed/products.yaml")).unwrap();
        assert!(inputs.len() >= 10);
        assert!(inputs.iter().any(|p| p.category == "Dairy"));
    }

    #[test]
    fn test_invalid_entry_rejects_whole_file() {
        let yaml = r#"
products:
  - name: Milk
    category: Dairy
    price: "1.10"
    stock: 10
  - name: Broken
    category: Dairy
    price: "-1"
    stock: 3
"#;
        assert!(parse(yaml).is_err());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let yaml = r#"
products:
  - name: Eggs
    category: Dairy
    price: "2.40"
    stock: 24
"#;
        let inputs = parse(yaml).unwrap();
        let eggs = inputs.first().unwrap();
        assert_eq!(eggs.description, "");
        assert_eq!(eggs.image_url, "");
        assert_eq!(eggs.stock, "24");
    }
}

//! Product catalog service.

use thiserror::Error;
use tracing::instrument;

use supermarket_core::ProductId;

use crate::db::{ProductCatalog, RepositoryError, Storage};
use crate::models::{Product, ProductDraft, ProductFilter, ProductInput, ValidationErrors};

/// Products shown on the home page.
pub const FEATURED_LIMIT: i64 = 8;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid product: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Catalog reads for shoppers and writes for admins.
pub struct CatalogService<'a> {
    catalog: &'a dyn ProductCatalog,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            catalog: storage.catalog.as_ref(),
        }
    }

    /// Products matching `filter`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on storage failure.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        Ok(self.catalog.list(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has that ID.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.catalog
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// Validate and insert a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` with every failing field.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, CatalogError> {
        let draft = ProductDraft::validate(input)?;
        let product = self.catalog.create(&draft).await?;
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Validate and overwrite a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` with every failing field.
    /// Returns `CatalogError::NotFound` if no product has that ID.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, CatalogError> {
        let draft = ProductDraft::validate(input)?;
        let product = self.catalog.update(id, &draft).await.map_err(|e| match e {
            RepositoryError::NotFound => CatalogError::NotFound(id),
            other => CatalogError::Repository(other),
        })?;
        tracing::info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Delete a product. Cart lines for it go with it; order history keeps
    /// its name and price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has that ID.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.catalog.delete(id).await? {
            tracing::info!(product_id = %id, "product deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound(id))
        }
    }

    /// Distinct categories, ascending.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on storage failure.
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.catalog.categories().await?)
    }

    /// Newest products first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on storage failure.
    pub async fn featured(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.catalog.featured(FEATURED_LIMIT).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn input(name: &str, category: &str, price: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            category: category.to_string(),
            price: price.to_string(),
            stock: "5".to_string(),
            ..ProductInput::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_search() {
        let storage = Storage::from_memory(&MemoryStore::new());
        let catalog = CatalogService::new(&storage);

        catalog.create(&input("Green Apples", "Fruit", "1.20")).await.unwrap();
        catalog.create(&input("Apple Juice", "Drinks", "2.50")).await.unwrap();
        catalog.create(&input("Bread", "Bakery", "3.00")).await.unwrap();

        let apples = catalog
            .list(&ProductFilter::from_query(Some("APPLE"), None))
            .await
            .unwrap();
        let names: Vec<_> = apples.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Apple Juice", "Green Apples"]);

        let fruit = catalog
            .list(&ProductFilter::from_query(Some("apple"), Some("Fruit")))
            .await
            .unwrap();
        assert_eq!(fruit.len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let storage = Storage::from_memory(&MemoryStore::new());
        let catalog = CatalogService::new(&storage);

        let err = catalog.create(&input(" ", "", "0")).await.unwrap_err();
        let CatalogError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert!(errors.has("name"));
        assert!(errors.has("category"));
        assert!(errors.has("price"));
        assert!(catalog.list(&ProductFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let storage = Storage::from_memory(&MemoryStore::new());
        let catalog = CatalogService::new(&storage);
        let missing = ProductId::new(42);

        assert!(matches!(
            catalog.update(missing, &input("Tea", "Drinks", "1.00")).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete(missing).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let storage = Storage::from_memory(&MemoryStore::new());
        let catalog = CatalogService::new(&storage);
        let tea = catalog.create(&input("Tea", "Drinks", "1.00")).await.unwrap();

        let updated = catalog
            .update(tea.id, &input("Green Tea", "Drinks", "1.50"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Green Tea");
        assert_eq!(catalog.get(tea.id).await.unwrap().price.to_string(), "$1.50");
    }
}

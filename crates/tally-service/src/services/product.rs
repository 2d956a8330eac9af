//! # Product Service

use std::sync::Arc;

use tracing::info;

use tally_core::validation::{validate_amount, validate_barcode, validate_product_name};
use tally_core::{Money, Product};
use tally_db::{ProductStore, Store};

use crate::error::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn Store>,
}

impl ProductService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        ProductService { store }
    }

    /// Adds a product to the catalog.
    ///
    /// ## Errors
    /// * `Validation` - empty or long name, malformed barcode, negative price
    /// * `Conflict` - barcode already registered
    pub async fn create(
        &self,
        name: &str,
        unit_price: Money,
        barcode: &str,
    ) -> ServiceResult<Product> {
        validate_product_name(name)?;
        validate_barcode(barcode)?;
        validate_amount("unit_price", unit_price.minor())?;

        let product = Product::new(name.trim(), unit_price, barcode);
        self.store.insert_product(&product).await?;

        info!(id = %product.id, barcode = %product.barcode, "Product created");
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    pub async fn list(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    /// Replaces the unit price. Lines already on receipts keep their price.
    pub async fn update_price(&self, id: &str, unit_price: Money) -> ServiceResult<Product> {
        validate_amount("unit_price", unit_price.minor())?;

        self.store.update_product_price(id, unit_price).await?;
        info!(id = %id, unit_price = %unit_price, "Product price updated");

        self.get(id).await
    }
}

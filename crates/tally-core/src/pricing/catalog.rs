//! Read-only product view used while pricing a receipt.

use std::collections::HashMap;

use crate::money::Money;
use crate::types::Product;

/// Products keyed by ID.
///
/// Built by the caller from whatever store holds the products. Pricing only
/// needs to know that a line's product still exists and what it costs now.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: HashMap<String, Product>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product.
    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn get(&self, product_id: &str) -> Option<&Product> {
        self.products.get(product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.products.contains_key(product_id)
    }

    /// Current unit price of a product.
    pub fn unit_price(&self, product_id: &str) -> Option<Money> {
        self.get(product_id).map(|p| p.unit_price)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for Catalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let bread = Product::new("Shoti", Money::from_minor(150), "100");
        let id = bread.id.clone();
        let catalog: Catalog = vec![bread].into_iter().collect();

        assert!(catalog.contains(&id));
        assert_eq!(catalog.unit_price(&id), Some(Money::from_minor(150)));
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.len(), 1);
    }
}

//! Combo validation.
//!
//! A combo applies only when every one of its products sits on the receipt.
//! Presence is all that counts: a line that satisfies one combo may satisfy
//! another, or its own flat discount, at the same time.

use std::collections::HashSet;

use crate::types::Receipt;

/// True iff every ID in `product_ids` appears on at least one receipt line.
///
/// IDs that exist nowhere in the catalog simply never match.
///
/// ## Example
/// ```rust
/// use tally_core::currency::CurrencyCode;
/// use tally_core::money::Money;
/// use tally_core::pricing::combo::is_satisfied;
/// use tally_core::types::{Product, Receipt};
///
/// let p = Product::new("Matsoni", Money::from_minor(100), "1");
/// let mut receipt = Receipt::open("shift", CurrencyCode::new("GEL").unwrap());
/// receipt.add_line(&p, 1).unwrap();
///
/// assert!(is_satisfied(&[p.id.clone()], &receipt));
/// assert!(!is_satisfied(&[p.id.clone(), "ghost".to_string()], &receipt));
/// ```
pub fn is_satisfied(product_ids: &[String], receipt: &Receipt) -> bool {
    let present: HashSet<&str> = receipt
        .lines
        .iter()
        .map(|line| line.product_id.as_str())
        .collect();

    product_ids.iter().all(|id| present.contains(id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CurrencyCode;
    use crate::money::Money;
    use crate::types::Product;

    fn receipt_with(products: &[&Product]) -> Receipt {
        let mut receipt = Receipt::open("shift-1", CurrencyCode::new("GEL").unwrap());
        for product in products {
            receipt.add_line(product, 1).unwrap();
        }
        receipt
    }

    #[test]
    fn test_all_present() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = Product::new("R", Money::from_minor(200), "2");
        let receipt = receipt_with(&[&p, &r]);

        assert!(is_satisfied(&[p.id.clone(), r.id.clone()], &receipt));
    }

    #[test]
    fn test_one_missing() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let r = Product::new("R", Money::from_minor(200), "2");
        let receipt = receipt_with(&[&p]);

        assert!(!is_satisfied(&[p.id.clone(), r.id.clone()], &receipt));
    }

    #[test]
    fn test_unknown_product_never_satisfied() {
        let p = Product::new("P", Money::from_minor(100), "1");
        let receipt = receipt_with(&[&p]);

        assert!(!is_satisfied(&[p.id.clone(), "not-in-catalog".to_string()], &receipt));
    }

    #[test]
    fn test_empty_receipt() {
        let receipt = receipt_with(&[]);
        assert!(!is_satisfied(&["a".to_string(), "b".to_string()], &receipt));
    }
}

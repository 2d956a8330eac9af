//! # Campaign Service
//!
//! Registration order is kept by the store and decides receipt-level ties,
//! so campaigns are never re-inserted on update; delete and create instead.

use std::sync::Arc;

use tracing::info;

use tally_core::{Campaign, CampaignKind, CampaignLink};
use tally_db::{CampaignStore, ProductStore, Store};

use crate::error::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct CampaignService {
    store: Arc<dyn Store>,
}

impl CampaignService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        CampaignService { store }
    }

    /// Registers a campaign.
    ///
    /// ## Errors
    /// * `Validation` - percent over 100, non-positive bundle sizes, a combo
    ///   with fewer than two distinct products, negative minimum amount
    /// * `NotFound` - a referenced product doesn't exist
    pub async fn create(&self, kind: CampaignKind) -> ServiceResult<Campaign> {
        let campaign = Campaign::new(kind)?;

        let wanted: Vec<String> = campaign
            .kind
            .product_ids()
            .into_iter()
            .map(str::to_string)
            .collect();
        let products = self.store.get_products(&wanted).await?;

        if let Some(missing) = wanted
            .iter()
            .find(|id| !products.iter().any(|product| &product.id == *id))
        {
            return Err(ServiceError::not_found("Product", missing.as_str()));
        }

        let links = campaign.links(&products);
        self.store.insert_campaign(&campaign, &links).await?;

        info!(
            id = %campaign.id,
            kind = campaign.kind.name(),
            products = links.len(),
            "Campaign created"
        );
        Ok(campaign)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Campaign> {
        self.store
            .get_campaign(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Campaign", id))
    }

    /// Every campaign in registration order.
    pub async fn list(&self) -> ServiceResult<Vec<Campaign>> {
        Ok(self.store.list_campaigns().await?)
    }

    /// The campaign's product links with the reference prices recorded at
    /// creation. Informational only; pricing never reads them.
    pub async fn links(&self, id: &str) -> ServiceResult<Vec<CampaignLink>> {
        self.get(id).await?;
        Ok(self.store.campaign_links(id).await?)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        self.store.delete_campaign(id).await?;
        info!(id = %id, "Campaign deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{product, store};
    use tally_core::{DiscountPercent, Money};

    fn pct(p: u32) -> DiscountPercent {
        DiscountPercent::new(p).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_in_order() {
        let store = store();
        let service = CampaignService::new(store.clone());
        let p = product(&store, "P", 100, "1").await;
        let r = product(&store, "R", 200, "2").await;

        let discount = service
            .create(CampaignKind::Discount {
                product_id: p.id.clone(),
                percent_off: pct(10),
            })
            .await
            .unwrap();
        let combo = service
            .create(CampaignKind::Combo {
                product_ids: vec![p.id.clone(), r.id.clone()],
                percent_off: pct(20),
            })
            .await
            .unwrap();

        let ids: Vec<String> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![discount.id.clone(), combo.id.clone()]);

        let links = service.links(&combo.id).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].reference_price, Money::from_minor(80));
    }

    #[tokio::test]
    async fn test_unknown_product_is_rejected() {
        let store = store();
        let service = CampaignService::new(store.clone());
        let p = product(&store, "P", 100, "1").await;

        let err = service
            .create(CampaignKind::Combo {
                product_ids: vec![p.id.clone(), "ghost".to_string()],
                percent_off: pct(20),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref id, .. } if id == "ghost"));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_kind_is_rejected() {
        let store = store();
        let service = CampaignService::new(store.clone());
        let p = product(&store, "P", 100, "1").await;

        let err = service
            .create(CampaignKind::BuyNGetN {
                product_id: p.id.clone(),
                buy_quantity: 0,
                get_quantity: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .create(CampaignKind::Combo {
                product_ids: vec![p.id.clone(), p.id.clone()],
                percent_off: pct(20),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = store();
        let service = CampaignService::new(store.clone());
        let campaign = service
            .create(CampaignKind::ReceiptDiscount {
                min_amount: Money::from_minor(500),
                percent_off: pct(5),
            })
            .await
            .unwrap();

        service.delete(&campaign.id).await.unwrap();
        let err = service.get(&campaign.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let err = service.delete(&campaign.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }
}

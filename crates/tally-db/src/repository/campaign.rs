//! # Campaign Repository
//!
//! SQLite operations for campaigns and their product links.
//!
//! ## Storage Layout
//! ```text
//! campaigns            one row per campaign; kind-specific columns are NULL
//!                      when the kind does not use them
//! campaign_products    one row per attached product, in declaration order,
//!                      with the informational reference price
//! ```
//!
//! Attached product IDs are read back from `campaign_products`, so a campaign
//! and its links are always written in one transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use tally_core::{Campaign, CampaignKind, CampaignLink, DiscountPercent, Money};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::store::CampaignStore;

const CAMPAIGN_COLUMNS: &str =
    "id, type AS kind, percent_off, buy_quantity, get_quantity, min_amount, created_at";

#[derive(Debug, FromRow)]
struct CampaignRow {
    id: String,
    kind: String,
    percent_off: Option<i64>,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    min_amount: Option<i64>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct LinkRow {
    campaign_id: String,
    product_id: String,
    reference_price: i64,
}

impl From<LinkRow> for CampaignLink {
    fn from(row: LinkRow) -> Self {
        CampaignLink {
            campaign_id: row.campaign_id,
            product_id: row.product_id,
            reference_price: Money::from_minor(row.reference_price),
        }
    }
}

impl CampaignRow {
    fn invalid(&self, what: &str) -> DbError {
        DbError::InvalidData(format!("campaign {}: {}", self.id, what))
    }

    fn required(&self, value: Option<i64>, column: &str) -> DbResult<i64> {
        value.ok_or_else(|| self.invalid(&format!("{} is NULL", column)))
    }

    fn percent(&self) -> DbResult<DiscountPercent> {
        let raw = self.required(self.percent_off, "percent_off")?;
        u32::try_from(raw)
            .ok()
            .and_then(|p| DiscountPercent::new(p).ok())
            .ok_or_else(|| self.invalid("percent_off out of range"))
    }

    fn single_product(&self, mut product_ids: Vec<String>) -> DbResult<String> {
        if product_ids.len() != 1 {
            return Err(self.invalid("expected exactly one linked product"));
        }
        Ok(product_ids.remove(0))
    }

    fn into_campaign(self, product_ids: Vec<String>) -> DbResult<Campaign> {
        let kind = match self.kind.as_str() {
            "discount" => CampaignKind::Discount {
                percent_off: self.percent()?,
                product_id: self.single_product(product_ids)?,
            },
            "buy_n_get_n" => CampaignKind::BuyNGetN {
                buy_quantity: self.required(self.buy_quantity, "buy_quantity")?,
                get_quantity: self.required(self.get_quantity, "get_quantity")?,
                product_id: self.single_product(product_ids)?,
            },
            "combo" => CampaignKind::Combo {
                percent_off: self.percent()?,
                product_ids,
            },
            "receipt_discount" => CampaignKind::ReceiptDiscount {
                min_amount: Money::from_minor(self.required(self.min_amount, "min_amount")?),
                percent_off: self.percent()?,
            },
            other => return Err(self.invalid(&format!("unknown type '{}'", other))),
        };

        Ok(Campaign {
            id: self.id,
            kind,
            created_at: self.created_at,
        })
    }
}

/// Column values for one campaign row: percent, buy, get, min amount.
fn kind_columns(kind: &CampaignKind) -> (Option<i64>, Option<i64>, Option<i64>, Option<i64>) {
    match kind {
        CampaignKind::Discount { percent_off, .. } | CampaignKind::Combo { percent_off, .. } => {
            (Some(percent_off.get() as i64), None, None, None)
        }
        CampaignKind::BuyNGetN {
            buy_quantity,
            get_quantity,
            ..
        } => (None, Some(*buy_quantity), Some(*get_quantity), None),
        CampaignKind::ReceiptDiscount {
            min_amount,
            percent_off,
        } => (Some(percent_off.get() as i64), None, None, Some(min_amount.minor())),
    }
}

/// Repository for campaign database operations.
#[derive(Debug, Clone)]
pub struct CampaignRepository {
    pool: SqlitePool,
}

impl CampaignRepository {
    /// Creates a new CampaignRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CampaignRepository { pool }
    }

    /// Inserts a campaign and its links in one transaction.
    pub async fn insert(&self, campaign: &Campaign, links: &[CampaignLink]) -> DbResult<()> {
        let (percent_off, buy_quantity, get_quantity, min_amount) = kind_columns(&campaign.kind);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, type, percent_off, buy_quantity, get_quantity, min_amount, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&campaign.id)
        .bind(campaign.kind.name())
        .bind(percent_off)
        .bind(buy_quantity)
        .bind(get_quantity)
        .bind(min_amount)
        .bind(campaign.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, link) in links.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO campaign_products (campaign_id, product_id, position, reference_price)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&link.campaign_id)
            .bind(&link.product_id)
            .bind(position as i64)
            .bind(link.reference_price.minor())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %campaign.id, kind = campaign.kind.name(), links = links.len(), "Campaign stored");
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Campaign>> {
        let row: Option<CampaignRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campaigns WHERE id = ?1",
            CAMPAIGN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let product_ids = self
            .links(id)
            .await?
            .into_iter()
            .map(|link| link.product_id)
            .collect();

        row.into_campaign(product_ids).map(Some)
    }

    /// Every campaign in registration order.
    pub async fn list(&self) -> DbResult<Vec<Campaign>> {
        let rows: Vec<CampaignRow> = sqlx::query_as(&format!(
            "SELECT {} FROM campaigns ORDER BY rowid",
            CAMPAIGN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let links: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT campaign_id, product_id, reference_price
            FROM campaign_products
            ORDER BY campaign_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut products: HashMap<String, Vec<String>> = HashMap::new();
        for link in links {
            products
                .entry(link.campaign_id)
                .or_default()
                .push(link.product_id);
        }

        debug!(count = rows.len(), "Loaded campaigns");

        rows.into_iter()
            .map(|row| {
                let ids = products.remove(&row.id).unwrap_or_default();
                row.into_campaign(ids)
            })
            .collect()
    }

    pub async fn links(&self, campaign_id: &str) -> DbResult<Vec<CampaignLink>> {
        let rows: Vec<LinkRow> = sqlx::query_as(
            r#"
            SELECT campaign_id, product_id, reference_price
            FROM campaign_products
            WHERE campaign_id = ?1
            ORDER BY position
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CampaignLink::from).collect())
    }

    /// Deletes a campaign and its links.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM campaign_products WHERE campaign_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM campaigns WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Campaign", id));
        }

        tx.commit().await?;

        info!(id = %id, "Campaign deleted");
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for Database {
    async fn insert_campaign(&self, campaign: &Campaign, links: &[CampaignLink]) -> DbResult<()> {
        self.campaigns().insert(campaign, links).await
    }

    async fn get_campaign(&self, id: &str) -> DbResult<Option<Campaign>> {
        self.campaigns().get_by_id(id).await
    }

    async fn list_campaigns(&self) -> DbResult<Vec<Campaign>> {
        self.campaigns().list().await
    }

    async fn campaign_links(&self, campaign_id: &str) -> DbResult<Vec<CampaignLink>> {
        self.campaigns().links(campaign_id).await
    }

    async fn delete_campaign(&self, id: &str) -> DbResult<()> {
        self.campaigns().delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::store::ProductStore;
    use tally_core::pricing::{CampaignIndex, Catalog, PricingEngine};
    use tally_core::{CurrencyCode, Product, Receipt};

    fn pct(p: u32) -> DiscountPercent {
        DiscountPercent::new(p).unwrap()
    }

    async fn setup() -> (Database, Product, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let p = Product::new("Churchkhela", Money::from_minor(100), "11");
        let r = Product::new("Tklapi", Money::from_minor(200), "22");
        db.insert_product(&p).await.unwrap();
        db.insert_product(&r).await.unwrap();
        (db, p, r)
    }

    #[tokio::test]
    async fn test_every_kind_survives_storage() {
        let (db, p, r) = setup().await;

        let campaigns = vec![
            Campaign::new(CampaignKind::Discount {
                product_id: p.id.clone(),
                percent_off: pct(10),
            })
            .unwrap(),
            Campaign::new(CampaignKind::BuyNGetN {
                product_id: r.id.clone(),
                buy_quantity: 2,
                get_quantity: 1,
            })
            .unwrap(),
            Campaign::new(CampaignKind::Combo {
                product_ids: vec![r.id.clone(), p.id.clone()],
                percent_off: pct(20),
            })
            .unwrap(),
            Campaign::new(CampaignKind::ReceiptDiscount {
                min_amount: Money::from_minor(500),
                percent_off: pct(5),
            })
            .unwrap(),
        ];

        for campaign in &campaigns {
            let links = campaign.links([&p, &r]);
            db.insert_campaign(campaign, &links).await.unwrap();
        }

        let loaded = db.list_campaigns().await.unwrap();
        let kinds: Vec<&CampaignKind> = loaded.iter().map(|c| &c.kind).collect();
        let expected: Vec<&CampaignKind> = campaigns.iter().map(|c| &c.kind).collect();
        assert_eq!(kinds, expected);

        let combo = db.get_campaign(&campaigns[2].id).await.unwrap().unwrap();
        assert_eq!(combo.kind.product_ids(), vec![r.id.as_str(), p.id.as_str()]);

        let links = db.campaign_links(&campaigns[2].id).await.unwrap();
        assert_eq!(links[0].reference_price.minor(), 160);
        assert_eq!(links[1].reference_price.minor(), 80);
    }

    #[tokio::test]
    async fn test_list_follows_registration_order() {
        let (db, p, r) = setup().await;

        // Same percent everywhere, so only registration order separates them
        let mut registered = Vec::new();
        for min_amount in [300, 100, 500, 200, 400] {
            let campaign = Campaign::new(CampaignKind::ReceiptDiscount {
                min_amount: Money::from_minor(min_amount),
                percent_off: pct(5),
            })
            .unwrap();
            db.insert_campaign(&campaign, &[]).await.unwrap();
            registered.push(campaign.id);
        }

        let ids = |campaigns: Vec<Campaign>| -> Vec<String> {
            campaigns.into_iter().map(|c| c.id).collect()
        };
        assert_eq!(ids(db.list_campaigns().await.unwrap()), registered);

        db.delete_campaign(&registered[1]).await.unwrap();
        registered.remove(1);
        let late = Campaign::new(CampaignKind::ReceiptDiscount {
            min_amount: Money::zero(),
            percent_off: pct(5),
        })
        .unwrap();
        db.insert_campaign(&late, &[]).await.unwrap();
        registered.push(late.id.clone());

        let loaded = db.list_campaigns().await.unwrap();
        assert_eq!(ids(loaded.clone()), registered);

        // Equal percentages: the earliest registered campaign wins the receipt
        let mut receipt = Receipt::open("shift-1", CurrencyCode::new("GEL").unwrap());
        receipt.add_line(&p, 2).unwrap();
        receipt.add_line(&r, 2).unwrap();
        let catalog: Catalog = vec![p.clone(), r.clone()].into_iter().collect();
        let index = CampaignIndex::build(loaded);
        let priced = PricingEngine::new(&index, &catalog).price(&receipt).unwrap();

        assert_eq!(priced.receipt_campaign_id.as_deref(), Some(registered[0].as_str()));
        assert_eq!(priced.discounted_total.minor(), 570);
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, p, _) = setup().await;
        let campaign = Campaign::new(CampaignKind::Discount {
            product_id: p.id.clone(),
            percent_off: pct(15),
        })
        .unwrap();
        db.insert_campaign(&campaign, &campaign.links([&p]))
            .await
            .unwrap();

        db.delete_campaign(&campaign.id).await.unwrap();
        assert!(db.get_campaign(&campaign.id).await.unwrap().is_none());
        assert!(db.campaign_links(&campaign.id).await.unwrap().is_empty());

        let err = db.delete_campaign(&campaign.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_link_to_unknown_product_fails() {
        let (db, _, _) = setup().await;
        let campaign = Campaign::new(CampaignKind::Discount {
            product_id: "ghost".to_string(),
            percent_off: pct(15),
        })
        .unwrap();
        let link = CampaignLink {
            campaign_id: campaign.id.clone(),
            product_id: "ghost".to_string(),
            reference_price: Money::zero(),
        };

        let err = db.insert_campaign(&campaign, &[link]).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(db.get_campaign(&campaign.id).await.unwrap().is_none());
    }
}

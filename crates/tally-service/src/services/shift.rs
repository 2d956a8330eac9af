//! # Shift Service
//!
//! ## Lifecycle
//! ```text
//!  open() ──► Open ──── x_report() (any number of times)
//!               │
//!               │ close() / z_report()   fails while receipts are open
//!               ▼
//!             Closed
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use tally_core::report::{sales_report, shift_report, SalesReport, ShiftReport};
use tally_core::Shift;
use tally_db::{ReceiptStore, ShiftStore, Store};

use crate::error::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct ShiftService {
    store: Arc<dyn Store>,
}

impl ShiftService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        ShiftService { store }
    }

    pub async fn open(&self) -> ServiceResult<Shift> {
        let shift = Shift::open();
        self.store.insert_shift(&shift).await?;

        info!(id = %shift.id, "Shift opened");
        Ok(shift)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Shift> {
        self.store
            .get_shift(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Shift", id))
    }

    async fn get_open(&self, id: &str) -> ServiceResult<Shift> {
        let shift = self.get(id).await?;
        if !shift.is_open() {
            return Err(ServiceError::already_closed("Shift", id));
        }
        Ok(shift)
    }

    /// Closes a shift.
    ///
    /// ## Errors
    /// * `NotFound` - no such shift
    /// * `AlreadyClosed` - closed before
    /// * `OpenReceipts` - a receipt in the shift is still open
    pub async fn close(&self, id: &str) -> ServiceResult<Shift> {
        self.get_open(id).await?;

        let open = self
            .store
            .receipts_for_shift(id)
            .await?
            .iter()
            .filter(|receipt| receipt.is_open())
            .count();
        if open > 0 {
            return Err(ServiceError::OpenReceipts {
                shift_id: id.to_string(),
                count: open,
            });
        }

        self.store.close_shift(id, Utc::now()).await?;
        info!(id = %id, "Shift closed");

        self.get(id).await
    }

    /// Mid-shift report. The shift stays open.
    pub async fn x_report(&self, id: &str) -> ServiceResult<ShiftReport> {
        self.get_open(id).await?;

        let receipts = self.store.receipts_for_shift(id).await?;
        Ok(shift_report(id, &receipts))
    }

    /// End-of-shift report: the X report, then the shift is closed.
    pub async fn z_report(&self, id: &str) -> ServiceResult<ShiftReport> {
        let report = self.x_report(id).await?;
        self.close(id).await?;

        info!(
            id = %id,
            receipts = report.receipt_count,
            revenue = %report.total_revenue,
            "Z report issued"
        );
        Ok(report)
    }

    /// Lifetime report across every shift.
    pub async fn sales_report(&self) -> ServiceResult<SalesReport> {
        let receipts = self.store.list_receipts().await?;
        Ok(sales_report(&receipts))
    }
}

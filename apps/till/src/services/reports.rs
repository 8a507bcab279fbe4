//! # Reporting Service
//!
//! Read-only summaries for managers. Dates are calendar days in UTC and
//! ranges include both ends.

use chrono::NaiveDate;
use tracing::debug;

use till_core::validation::{validate_date_range, validate_limit};
use till_core::Sale;
use till_db::{BestSeller, Database, InventoryValuation, SalesSummary};

use crate::error::ServiceResult;

/// Best sellers shown when no limit is given.
pub const DEFAULT_BEST_SELLER_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct ReportService {
    db: Database,
}

impl ReportService {
    pub fn new(db: Database) -> Self {
        ReportService { db }
    }

    /// Totals over sales in `[start, end]`. `start > end` is rejected.
    pub async fn sales_summary(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<SalesSummary> {
        validate_date_range(start, end)?;
        let summary = self.db.reports().sales_summary(start, end).await?;
        debug!(
            %start,
            %end,
            transactions = summary.transaction_count,
            revenue = summary.total_revenue_cents,
            "Sales summary"
        );
        Ok(summary)
    }

    /// Top `limit` products by units sold in `[start, end]`.
    pub async fn best_sellers(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
    ) -> ServiceResult<Vec<BestSeller>> {
        validate_date_range(start, end)?;
        validate_limit(limit)?;
        Ok(self.db.reports().best_sellers(start, end, limit).await?)
    }

    pub async fn inventory_valuation(&self) -> ServiceResult<InventoryValuation> {
        Ok(self.db.reports().inventory_valuation().await?)
    }

    /// Latest sales, newest first.
    pub async fn recent_sales(&self, limit: i64) -> ServiceResult<Vec<Sale>> {
        validate_limit(limit)?;
        Ok(self.db.sales().recent(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use till_db::DbConfig;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_reversed_range_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reports = ReportService::new(db);

        let err = reports.sales_summary(day(2), day(1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = reports.best_sellers(day(2), day(1), 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reports = ReportService::new(db);

        let summary = reports.sales_summary(day(1), day(31)).await.unwrap();
        assert_eq!(summary, SalesSummary::default());
        assert!(reports.best_sellers(day(1), day(31), 10).await.unwrap().is_empty());
        assert_eq!(reports.inventory_valuation().await.unwrap(), InventoryValuation::default());
        assert!(reports.recent_sales(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_validated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reports = ReportService::new(db);

        assert!(reports.best_sellers(day(1), day(1), 0).await.is_err());
        assert!(reports.recent_sales(-1).await.is_err());
    }
}

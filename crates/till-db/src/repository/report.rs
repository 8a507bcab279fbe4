//! # Report Repository
//!
//! Read-only aggregates over sales and stock.
//!
//! Date ranges are inclusive calendar days in UTC: a sale belongs to a day
//! when `DATE(created_at)` equals it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use till_core::Money;

/// Totals over the sales of a date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SalesSummary {
    pub transaction_count: i64,
    pub total_revenue_cents: i64,
    pub total_tax_cents: i64,
    pub total_discount_cents: i64,
    /// Units sold across all lines.
    pub total_items: i64,
}

impl SalesSummary {
    pub fn total_revenue(&self) -> Money {
        Money::from_cents(self.total_revenue_cents)
    }

    pub fn total_tax(&self) -> Money {
        Money::from_cents(self.total_tax_cents)
    }

    pub fn total_discount(&self) -> Money {
        Money::from_cents(self.total_discount_cents)
    }

    /// Average sale total, zero for an empty range.
    pub fn average_sale(&self) -> Money {
        if self.transaction_count == 0 {
            return Money::zero();
        }
        Money::from_cents(self.total_revenue_cents / self.transaction_count)
    }
}

/// One product's sales over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BestSeller {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

impl BestSeller {
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.revenue_cents)
    }
}

/// Stock on hand valued at purchase and selling price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryValuation {
    pub product_count: i64,
    pub total_units: i64,
    /// Σ stock × purchase_price.
    pub cost_value_cents: i64,
    /// Σ stock × selling_price.
    pub retail_value_cents: i64,
}

impl InventoryValuation {
    pub fn cost_value(&self) -> Money {
        Money::from_cents(self.cost_value_cents)
    }

    pub fn retail_value(&self) -> Money {
        Money::from_cents(self.retail_value_cents)
    }
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sums sales whose day is in `[start, end]`. An empty range yields zeros.
    pub async fn sales_summary(&self, start: NaiveDate, end: NaiveDate) -> DbResult<SalesSummary> {
        debug!(%start, %end, "Computing sales summary");

        let summary = sqlx::query_as::<_, SalesSummary>(
            r#"
            SELECT
                COUNT(*) AS transaction_count,
                COALESCE(SUM(s.total_cents), 0) AS total_revenue_cents,
                COALESCE(SUM(s.tax_cents), 0) AS total_tax_cents,
                COALESCE(SUM(s.discount_cents), 0) AS total_discount_cents,
                COALESCE((
                    SELECT SUM(si.quantity)
                    FROM sale_items si
                    JOIN sales s2 ON s2.id = si.sale_id
                    WHERE DATE(s2.created_at) >= DATE(?1) AND DATE(s2.created_at) <= DATE(?2)
                ), 0) AS total_items
            FROM sales s
            WHERE DATE(s.created_at) >= DATE(?1) AND DATE(s.created_at) <= DATE(?2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Products by units sold in `[start, end]`, most first. Ties go to the
    /// product name, then SKU, ascending.
    pub async fn best_sellers(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: i64,
    ) -> DbResult<Vec<BestSeller>> {
        debug!(%start, %end, limit, "Computing best sellers");

        let rows = sqlx::query_as::<_, BestSeller>(
            r#"
            SELECT
                si.product_id AS product_id,
                COALESCE(p.sku, MAX(si.sku_snapshot)) AS sku,
                COALESCE(p.name, MAX(si.name_snapshot)) AS name,
                SUM(si.quantity) AS quantity_sold,
                SUM(si.line_total_cents) AS revenue_cents
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            LEFT JOIN products p ON p.id = si.product_id
            WHERE DATE(s.created_at) >= DATE(?1) AND DATE(s.created_at) <= DATE(?2)
            GROUP BY si.product_id
            ORDER BY quantity_sold DESC, name ASC, sku ASC
            LIMIT ?3
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Values active stock. Products with zero stock contribute zero.
    pub async fn inventory_valuation(&self) -> DbResult<InventoryValuation> {
        let valuation = sqlx::query_as::<_, InventoryValuation>(
            r#"
            SELECT
                COUNT(*) AS product_count,
                COALESCE(SUM(stock), 0) AS total_units,
                COALESCE(SUM(stock * purchase_price_cents), 0) AS cost_value_cents,
                COALESCE(SUM(stock * selling_price_cents), 0) AS retail_value_cents
            FROM products
            WHERE is_active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(valuation)
    }
}

//! Reports menu.

use std::io::{self, BufRead, Write};

use chrono::{NaiveDate, Utc};

use till_core::validation::parse_date;

use super::{format, parse_number, Cli};
use crate::error::ServiceResult;
use crate::services::reports::DEFAULT_BEST_SELLER_LIMIT;

impl<R: BufRead, W: Write> Cli<R, W> {
    pub(super) async fn reports_menu(&mut self) -> io::Result<()> {
        loop {
            let choice = self.prompt.menu(
                "Reports",
                &[
                    ("s", "Sales summary"),
                    ("t", "Best sellers"),
                    ("v", "Inventory valuation"),
                    ("r", "Recent sales"),
                    ("p", "Show receipt"),
                    ("b", "Back"),
                ],
            )?;

            match choice.as_str() {
                "s" => self.sales_summary().await?,
                "t" => self.best_sellers().await?,
                "v" => self.inventory_valuation().await?,
                "r" => self.recent_sales().await?,
                "p" => self.show_receipt().await?,
                "b" => return Ok(()),
                _ => self.prompt.say("Unknown choice.")?,
            }
        }
    }

    /// Asks for an inclusive date range, defaulting to today.
    fn ask_range(&mut self) -> io::Result<Option<(NaiveDate, NaiveDate)>> {
        let today = Utc::now().date_naive().to_string();
        let start = self.prompt.ask_or("From (YYYY-MM-DD)", &today)?;
        let end = self.prompt.ask_or("To (YYYY-MM-DD)", &today)?;

        let parsed = (|| -> ServiceResult<(NaiveDate, NaiveDate)> {
            Ok((parse_date("start", &start)?, parse_date("end", &end)?))
        })();
        self.report(parsed)
    }

    async fn sales_summary(&mut self) -> io::Result<()> {
        let Some((start, end)) = self.ask_range()? else {
            return Ok(());
        };
        let result = self.services.reports.sales_summary(start, end).await;
        let Some(summary) = self.report(result)? else {
            return Ok(());
        };

        let lines = [
            format!("Sales {} to {}", start, end),
            format!("  Transactions: {}", summary.transaction_count),
            format!("  Items sold:   {}", summary.total_items),
            format!("  Revenue:      {}", self.money(summary.total_revenue())),
            format!("  Tax:          {}", self.money(summary.total_tax())),
            format!("  Discounts:    {}", self.money(summary.total_discount())),
            format!("  Average sale: {}", self.money(summary.average_sale())),
        ];
        for line in lines {
            self.prompt.say(line)?;
        }
        Ok(())
    }

    async fn best_sellers(&mut self) -> io::Result<()> {
        let Some((start, end)) = self.ask_range()? else {
            return Ok(());
        };
        let limit = self
            .prompt
            .ask_or("How many", &DEFAULT_BEST_SELLER_LIMIT.to_string())?;
        let Some(limit) = self.report(parse_number::<i64>("How many", &limit))? else {
            return Ok(());
        };

        let result = self.services.reports.best_sellers(start, end, limit).await;
        let Some(rows) = self.report(result)? else {
            return Ok(());
        };
        if rows.is_empty() {
            return self.prompt.say("No sales in this period.");
        }
        for (rank, row) in rows.iter().enumerate() {
            let line = format!(
                "{:>3}. {:<12} {:<28} {:>5} sold {:>10}",
                rank + 1,
                row.sku,
                row.name,
                row.quantity_sold,
                self.money(row.revenue())
            );
            self.prompt.say(line)?;
        }
        Ok(())
    }

    async fn inventory_valuation(&mut self) -> io::Result<()> {
        let result = self.services.reports.inventory_valuation().await;
        let Some(valuation) = self.report(result)? else {
            return Ok(());
        };

        let lines = [
            format!("Active products: {}", valuation.product_count),
            format!("Units on hand:   {}", valuation.total_units),
            format!("Value at cost:   {}", self.money(valuation.cost_value())),
            format!("Value at retail: {}", self.money(valuation.retail_value())),
        ];
        for line in lines {
            self.prompt.say(line)?;
        }
        Ok(())
    }

    async fn recent_sales(&mut self) -> io::Result<()> {
        let limit = self.prompt.ask_or("How many", "10")?;
        let Some(limit) = self.report(parse_number::<i64>("How many", &limit))? else {
            return Ok(());
        };

        let result = self.services.reports.recent_sales(limit).await;
        let Some(sales) = self.report(result)? else {
            return Ok(());
        };
        if sales.is_empty() {
            return self.prompt.say("No sales yet.");
        }
        for sale in &sales {
            let line = format::sale_line(sale, &self.config);
            self.prompt.say(line)?;
        }
        Ok(())
    }

    async fn show_receipt(&mut self) -> io::Result<()> {
        let number = self.prompt.ask("Receipt number")?;
        let result = self.services.checkout.receipt_by_number(&number).await;
        if let Some(receipt) = self.report(result)? {
            let text = format::receipt_text(&receipt, &self.config);
            self.prompt.say(text)?;
        }
        Ok(())
    }
}

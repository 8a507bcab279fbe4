//! Products menu: catalogue maintenance, stock and CSV files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use till_core::{Money, NewProduct, ProductUpdate};

use super::{format, parse_number, Cli};
use crate::error::ServiceResult;
use crate::services::DeleteOutcome;

impl<R: BufRead, W: Write> Cli<R, W> {
    pub(super) async fn products_menu(&mut self) -> io::Result<()> {
        loop {
            let choice = self.prompt.menu(
                "Products",
                &[
                    ("s", "Search"),
                    ("v", "View product"),
                    ("n", "New product"),
                    ("e", "Edit product"),
                    ("d", "Delete product"),
                    ("k", "Adjust stock"),
                    ("w", "Low stock"),
                    ("c", "Categories"),
                    ("g", "Add category"),
                    ("i", "Import CSV"),
                    ("o", "Export CSV"),
                    ("b", "Back"),
                ],
            )?;

            match choice.as_str() {
                "s" => {
                    let query = self.prompt.ask("Search (blank lists all)")?;
                    self.print_search(&query).await?;
                }
                "v" => self.view_product().await?,
                "n" => self.new_product().await?,
                "e" => self.edit_product().await?,
                "d" => self.delete_product().await?,
                "k" => self.adjust_stock().await?,
                "w" => self.low_stock().await?,
                "c" => self.list_categories().await?,
                "g" => self.add_category().await?,
                "i" => self.import_csv().await?,
                "o" => self.export_csv().await?,
                "b" => return Ok(()),
                _ => self.prompt.say("Unknown choice.")?,
            }
        }
    }

    async fn view_product(&mut self) -> io::Result<()> {
        let sku = self.prompt.ask("SKU")?;
        let result = self.services.catalogue.get(&sku).await;
        let Some(product) = self.report(result)? else {
            return Ok(());
        };
        let details = format::product_details(&product, &self.config);
        self.prompt.say(details)?;

        let result = self.services.catalogue.stock_history(&sku).await;
        if let Some(history) = self.report(result)? {
            self.prompt.say("  Stock history:")?;
            for entry in &history {
                self.prompt.say(format!("    {}", format::history_line(entry)))?;
            }
        }
        Ok(())
    }

    async fn new_product(&mut self) -> io::Result<()> {
        let name = self.prompt.ask("Name")?;
        let sku = self.prompt.ask("SKU")?;
        let purchase = self.prompt.ask("Purchase price")?;
        let selling = self.prompt.ask("Selling price")?;
        let stock = self.prompt.ask_or("Stock", "0")?;
        let min_stock = self.prompt.ask_or("Restock threshold", "0")?;
        let category = self.prompt.ask_optional("Category (optional)")?;
        let description = self.prompt.ask_optional("Description (optional)")?;

        let parsed = (|| -> ServiceResult<NewProduct> {
            Ok(NewProduct {
                name,
                sku,
                purchase_price: Money::parse("purchase_price", &purchase)?,
                selling_price: Money::parse("selling_price", &selling)?,
                stock: parse_number("Stock", &stock)?,
                category,
                description,
                image_path: None,
                min_stock: parse_number("Restock threshold", &min_stock)?,
            })
        })();
        let Some(new) = self.report(parsed)? else {
            return Ok(());
        };

        let result = self.services.catalogue.create(new).await;
        if let Some(product) = self.report(result)? {
            self.prompt.say(format!("Added {} ({}).", product.name, product.sku))?;
        }
        Ok(())
    }

    async fn edit_product(&mut self) -> io::Result<()> {
        let sku = self.prompt.ask("SKU")?;
        let result = self.services.catalogue.get(&sku).await;
        let Some(current) = self.report(result)? else {
            return Ok(());
        };
        self.prompt
            .say("Press enter to keep a value; '-' clears optional fields.")?;

        let name = self.prompt.ask_optional(&format!("Name [{}]", current.name))?;
        let new_sku = self.prompt.ask_optional(&format!("SKU [{}]", current.sku))?;
        let purchase = self
            .prompt
            .ask_optional(&format!("Purchase price [{}]", current.purchase_price()))?;
        let selling = self
            .prompt
            .ask_optional(&format!("Selling price [{}]", current.selling_price()))?;
        let stock = self.prompt.ask_optional(&format!("Stock [{}]", current.stock))?;
        let min_stock = self
            .prompt
            .ask_optional(&format!("Restock threshold [{}]", current.min_stock))?;
        let category = self.prompt.ask_optional(&format!(
            "Category [{}]",
            current.category.as_deref().unwrap_or("")
        ))?;
        let description = self.prompt.ask_optional(&format!(
            "Description [{}]",
            current.description.as_deref().unwrap_or("")
        ))?;

        let clearable = |value: Option<String>| value.map(|v| if v == "-" { String::new() } else { v });
        let parsed = (|| -> ServiceResult<ProductUpdate> {
            Ok(ProductUpdate {
                name,
                sku: new_sku,
                purchase_price: purchase
                    .map(|p| Money::parse("purchase_price", &p))
                    .transpose()?,
                selling_price: selling
                    .map(|p| Money::parse("selling_price", &p))
                    .transpose()?,
                stock: stock.map(|s| parse_number("Stock", &s)).transpose()?,
                category: clearable(category),
                description: clearable(description),
                image_path: None,
                min_stock: min_stock
                    .map(|s| parse_number("Restock threshold", &s))
                    .transpose()?,
            })
        })();
        let Some(update) = self.report(parsed)? else {
            return Ok(());
        };

        let result = self.services.catalogue.edit(&current.sku, update).await;
        if let Some(product) = self.report(result)? {
            let details = format::product_details(&product, &self.config);
            self.prompt.say(details)?;
        }
        Ok(())
    }

    async fn delete_product(&mut self) -> io::Result<()> {
        let sku = self.prompt.ask("SKU")?;
        let question = format!(
            "Delete {} (policy: {})?",
            sku,
            self.services.catalogue.delete_policy()
        );
        if !self.prompt.confirm(&question)? {
            return Ok(());
        }

        let result = self.services.catalogue.delete(&sku).await;
        match self.report(result)? {
            Some(DeleteOutcome::Deleted) => self.prompt.say(format!("Deleted {}.", sku)),
            Some(DeleteOutcome::Archived) => self.prompt.say(format!("Archived {}.", sku)),
            None => Ok(()),
        }
    }

    async fn adjust_stock(&mut self) -> io::Result<()> {
        let sku = self.prompt.ask("SKU")?;
        let delta = self.prompt.ask("Change (e.g. 12 or -3)")?;
        let Some(delta) = self.report(parse_number::<i64>("Change", delta.trim_start_matches('+')))? else {
            return Ok(());
        };
        let note = self.prompt.ask_optional("Note (optional)")?;

        let result = self
            .services
            .catalogue
            .adjust_stock(&sku, delta, note.as_deref())
            .await;
        if let Some(stock) = self.report(result)? {
            self.prompt.say(format!("{} stock is now {}.", sku, stock))?;
        }
        Ok(())
    }

    async fn low_stock(&mut self) -> io::Result<()> {
        let result = self.services.catalogue.low_stock().await;
        let Some(products) = self.report(result)? else {
            return Ok(());
        };
        if products.is_empty() {
            return self.prompt.say("Nothing is low on stock.");
        }
        for product in &products {
            let line = format::product_line(product, &self.config);
            self.prompt.say(line)?;
        }
        Ok(())
    }

    async fn list_categories(&mut self) -> io::Result<()> {
        let result = self.services.catalogue.list_categories().await;
        let Some(categories) = self.report(result)? else {
            return Ok(());
        };
        if categories.is_empty() {
            return self.prompt.say("No categories yet.");
        }
        for category in &categories {
            match &category.description {
                Some(description) => self
                    .prompt
                    .say(format!("  {} - {}", category.name, description))?,
                None => self.prompt.say(format!("  {}", category.name))?,
            }
        }
        Ok(())
    }

    async fn add_category(&mut self) -> io::Result<()> {
        let name = self.prompt.ask("Category name")?;
        let description = self.prompt.ask_optional("Description (optional)")?;

        let result = self
            .services
            .catalogue
            .add_category(&name, description.as_deref())
            .await;
        if let Some(category) = self.report(result)? {
            self.prompt.say(format!("Added category {}.", category.name))?;
        }
        Ok(())
    }

    async fn import_csv(&mut self) -> io::Result<()> {
        let path = self.prompt.ask("CSV file to import")?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => return self.prompt.say(format!("Error: cannot open {}: {}", path, e)),
        };

        let result = self.services.catalogue.import_csv(BufReader::new(file)).await;
        let Some(report) = self.report(result)? else {
            return Ok(());
        };

        self.prompt.say(format!(
            "Imported {} row(s), skipped {}.",
            report.imported_count(),
            report.skipped_count()
        ))?;
        let skipped: Vec<String> = report
            .skipped()
            .map(|(row, reason)| format!("  row {}: {}", row, reason))
            .collect();
        for line in skipped {
            self.prompt.say(line)?;
        }
        Ok(())
    }

    async fn export_csv(&mut self) -> io::Result<()> {
        let path = self.prompt.ask_or("Export to", "catalogue.csv")?;
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) => return self.prompt.say(format!("Error: cannot create {}: {}", path, e)),
        };

        let result = self.services.catalogue.export_csv(BufWriter::new(file)).await;
        if let Some(rows) = self.report(result)? {
            self.prompt.say(format!("Exported {} product(s) to {}.", rows, path))?;
        }
        Ok(())
    }
}

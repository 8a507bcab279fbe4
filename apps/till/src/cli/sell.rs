//! Sell menu: build the cart, hold and resume carts, take payment.

use std::io::{self, BufRead, Write};

use futures_util::StreamExt;

use till_core::{Discount, Money, PaymentMethod, User};

use super::{format, parse_number, Cli};
use crate::error::{ServiceError, ServiceResult};

/// Search results shown at once.
const SEARCH_PAGE: usize = 20;

impl<R: BufRead, W: Write> Cli<R, W> {
    pub(super) async fn sell_menu(&mut self, user: &User) -> io::Result<()> {
        loop {
            self.show_cart()?;
            let choice = self.prompt.menu(
                "Sell",
                &[
                    ("a", "Add item"),
                    ("q", "Change quantity"),
                    ("r", "Remove item"),
                    ("d", "Discount"),
                    ("x", "Clear discount"),
                    ("f", "Find product"),
                    ("h", "Hold cart"),
                    ("u", "Resume held cart"),
                    ("c", "Clear cart"),
                    ("p", "Pay"),
                    ("b", "Back"),
                ],
            )?;

            match choice.as_str() {
                "a" => self.add_item().await?,
                "q" => self.change_quantity().await?,
                "r" => self.remove_item()?,
                "d" => self.apply_discount()?,
                "x" => {
                    let result = self
                        .register
                        .current_mut()
                        .clear_discount()
                        .map_err(ServiceError::from);
                    self.report(result)?;
                }
                "f" => self.find_product().await?,
                "h" => self.hold_cart()?,
                "u" => self.resume_cart()?,
                "c" => {
                    if self.prompt.confirm("Clear the cart?")? {
                        self.register.current_mut().clear();
                    }
                }
                "p" => self.pay(user).await?,
                "b" => return Ok(()),
                _ => self.prompt.say("Unknown choice.")?,
            }
        }
    }

    fn show_cart(&mut self) -> io::Result<()> {
        let cart = self.register.current();
        let totals = self.services.checkout.totals(cart);
        let text = format::cart_text(cart, &totals, &self.config);
        self.prompt.blank()?;
        self.prompt.say(text)?;
        if !self.register.held().is_empty() {
            let labels: Vec<&str> = self.register.held().iter().map(|h| h.label.as_str()).collect();
            self.prompt.say(format!("On hold: {}", labels.join(", ")))?;
        }
        Ok(())
    }

    async fn add_item(&mut self) -> io::Result<()> {
        let sku = self.prompt.ask("SKU")?;
        let quantity = self.prompt.ask_or("Quantity", "1")?;
        let Some(quantity) = self.report(parse_number::<i64>("Quantity", &quantity))? else {
            return Ok(());
        };

        let result = self
            .services
            .checkout
            .add_to_cart(self.register.current_mut(), &sku, quantity)
            .await;
        self.report(result)?;
        Ok(())
    }

    async fn change_quantity(&mut self) -> io::Result<()> {
        let sku = self.prompt.ask("SKU")?;
        let quantity = self.prompt.ask("New quantity (0 removes)")?;
        let Some(quantity) = self.report(parse_number::<i64>("Quantity", &quantity))? else {
            return Ok(());
        };

        let result = self
            .services
            .checkout
            .set_quantity(self.register.current_mut(), &sku, quantity)
            .await;
        self.report(result)?;
        Ok(())
    }

    fn remove_item(&mut self) -> io::Result<()> {
        let sku = self.prompt.ask("SKU")?;
        let result = self
            .services
            .checkout
            .remove_from_cart(self.register.current_mut(), &sku);
        self.report(result)?;
        Ok(())
    }

    fn apply_discount(&mut self) -> io::Result<()> {
        let input = self.prompt.ask("Discount (e.g. 10% or 2.00)")?;
        let result = parse_discount(&input).and_then(|discount| {
            self.services
                .checkout
                .apply_discount(self.register.current_mut(), discount)
        });
        self.report(result)?;
        Ok(())
    }

    async fn find_product(&mut self) -> io::Result<()> {
        let query = self.prompt.ask("Search (name or SKU)")?;
        self.print_search(&query).await
    }

    /// Prints the first page of search results.
    pub(super) async fn print_search(&mut self, query: &str) -> io::Result<()> {
        let results: Vec<ServiceResult<_>> = self
            .services
            .catalogue
            .search(query)
            .take(SEARCH_PAGE + 1)
            .collect()
            .await;

        let mut shown = 0;
        for result in results {
            let Some(product) = self.report(result)? else {
                return Ok(());
            };
            if shown == SEARCH_PAGE {
                self.prompt.say("... more results, refine the search")?;
                break;
            }
            let line = format::product_line(&product, &self.config);
            self.prompt.say(line)?;
            shown += 1;
        }
        if shown == 0 {
            self.prompt.say("No products found.")?;
        }
        Ok(())
    }

    fn hold_cart(&mut self) -> io::Result<()> {
        let label = self.prompt.ask("Hold as (label)")?;
        let result = self.register.hold(&label);
        if self.report(result)?.is_some() {
            self.prompt.say(format!("Cart held as '{}'.", label.trim()))?;
        }
        Ok(())
    }

    fn resume_cart(&mut self) -> io::Result<()> {
        if self.register.held().is_empty() {
            return self.prompt.say("No carts on hold.");
        }
        let label = self.prompt.ask("Resume which cart")?;
        let result = self.register.resume(&label);
        self.report(result)?;
        Ok(())
    }

    async fn pay(&mut self, user: &User) -> io::Result<()> {
        if self.register.current().is_empty() {
            return self.prompt.say("Cart is empty.");
        }
        let total = self.services.checkout.totals(self.register.current()).total;
        let due = self.money(total);
        self.prompt.say(format!("Amount due: {}", due))?;

        let method = self.prompt.ask_or("Payment method (cash/card/mobile)", "cash")?;
        let Some(method) = self.report(method.parse::<PaymentMethod>().map_err(ServiceError::from))? else {
            return Ok(());
        };

        let result = self
            .services
            .checkout
            .finalize(self.register.current_mut(), user, method)
            .await;
        if let Some(receipt) = self.report(result)? {
            let text = format::receipt_text(&receipt, &self.config);
            self.prompt.say(text)?;
            self.register.current_mut().clear();
        }
        Ok(())
    }
}

/// `10%` or `12.5%` is a percentage, anything else a fixed amount.
fn parse_discount(input: &str) -> ServiceResult<Discount> {
    let input = input.trim();
    match input.strip_suffix('%') {
        Some(pct) => {
            let pct: f64 = pct
                .trim()
                .parse()
                .map_err(|_| ServiceError::validation("Discount percentage must be a number"))?;
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(ServiceError::validation(
                    "Discount percentage must be between 0 and 100",
                ));
            }
            Ok(Discount::Percentage((pct * 100.0).round() as u32))
        }
        None => Ok(Discount::Fixed(Money::parse("discount", input)?)),
    }
}

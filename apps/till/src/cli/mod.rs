//! # Text Interface
//!
//! Login, then menus gated by the user's role.
//!
//! ## Menu Tree
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Login ──► Main menu                                                    │
//! │              ├── [1] Sell        (all roles)    sell.rs                 │
//! │              ├── [2] Products    (admin, manager) products.rs           │
//! │              ├── [3] Reports     (admin, manager) reports.rs            │
//! │              ├── [4] Users       (admin)         users.rs               │
//! │              │       Change password (others)                          │
//! │              └── [0] Log out ──► Login                                  │
//! │                                                                         │
//! │  Blank username or end of input quits.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Service errors are printed and the menu continues; only I/O errors end
//! the session.

mod format;
pub mod prompt;
mod products;
mod reports;
mod sell;
mod users;

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use tracing::debug;

use till_core::{Money, User, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};

use crate::config::AppConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::services::{Register, Services};

pub use prompt::Prompt;

/// An interactive session over any input and output.
pub struct Cli<R, W> {
    services: Services,
    config: AppConfig,
    prompt: Prompt<R, W>,
    register: Register,
}

impl<R: BufRead, W: Write> Cli<R, W> {
    pub fn new(services: Services, config: AppConfig, prompt: Prompt<R, W>) -> Self {
        Cli {
            services,
            config,
            prompt,
            register: Register::new(),
        }
    }

    pub fn into_prompt(self) -> Prompt<R, W> {
        self.prompt
    }

    /// Runs login and menus until the user quits or input ends.
    pub async fn run(&mut self) -> io::Result<()> {
        match self.session_loop().await {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("Input closed, leaving");
                Ok(())
            }
            other => other,
        }
    }

    async fn session_loop(&mut self) -> io::Result<()> {
        self.prompt
            .say(format!("{} - point of sale", self.config.store_name))?;

        loop {
            let Some(user) = self.login().await? else {
                self.prompt.say("Bye.")?;
                return Ok(());
            };

            self.main_menu(&user).await?;

            if !self.register.held().is_empty() {
                self.prompt.say(format!(
                    "Discarding {} held cart(s).",
                    self.register.held().len()
                ))?;
            }
            self.register = Register::new();
            self.prompt.say(format!("Goodbye, {}.", user.username))?;
        }
    }

    async fn login(&mut self) -> io::Result<Option<User>> {
        loop {
            self.prompt.blank()?;
            let username = self.prompt.ask("Username (blank to quit)")?;
            if username.is_empty() {
                return Ok(None);
            }
            let password = self.prompt.ask("Password")?;

            match self.services.users.authenticate(&username, &password).await {
                Ok(user) => {
                    self.prompt
                        .say(format!("Welcome, {} ({}).", user.username, user.role))?;
                    if user.username == DEFAULT_ADMIN_USERNAME && password == DEFAULT_ADMIN_PASSWORD {
                        self.prompt.say(
                            "WARNING: the default admin password is in use. Change it under Users.",
                        )?;
                    }
                    return Ok(Some(user));
                }
                Err(e) => self.prompt.say(format!("Error: {}", e))?,
            }
        }
    }

    async fn main_menu(&mut self, user: &User) -> io::Result<()> {
        loop {
            let mut entries = vec![("1", "Sell")];
            if user.role.can_manage_catalogue() {
                entries.push(("2", "Products"));
            }
            if user.role.can_view_reports() {
                entries.push(("3", "Reports"));
            }
            if user.role.is_admin() {
                entries.push(("4", "Users"));
            } else {
                entries.push(("4", "Change password"));
            }
            entries.push(("0", "Log out"));

            match self.prompt.menu("Main menu", &entries)?.as_str() {
                "1" => self.sell_menu(user).await?,
                "2" if user.role.can_manage_catalogue() => self.products_menu().await?,
                "3" if user.role.can_view_reports() => self.reports_menu().await?,
                "4" if user.role.is_admin() => self.users_menu(user).await?,
                "4" => self.change_own_password(user).await?,
                "0" => return Ok(()),
                _ => self.prompt.say("Unknown choice.")?,
            }
        }
    }

    /// Prints a service error and yields `None`, or yields the value.
    fn report<T>(&mut self, result: ServiceResult<T>) -> io::Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                self.prompt.say(format!("Error: {}", e))?;
                Ok(None)
            }
        }
    }

    fn money(&self, amount: Money) -> String {
        self.config.format_currency(amount)
    }
}

/// Parses a whole number typed by the user.
fn parse_number<T: FromStr>(field: &str, input: &str) -> ServiceResult<T> {
    input
        .trim()
        .parse()
        .map_err(|_| ServiceError::validation(format!("{} must be a whole number", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::TaxRate;
    use till_db::{Database, DbConfig};

    async fn session(input: &str) -> String {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = AppConfig {
            tax_rate: TaxRate::from_bps(800),
            ..AppConfig::default()
        };
        let services = Services::new(&db, &config);
        services.users.ensure_default_admin().await.unwrap();

        let mut cli = Cli::new(services, config, Prompt::new(input.as_bytes(), Vec::new()));
        cli.run().await.unwrap();
        String::from_utf8(cli.into_prompt().into_output()).unwrap()
    }

    #[tokio::test]
    async fn test_quit_on_blank_username() {
        let out = session("\n").await;
        assert!(out.starts_with("Till POS - point of sale\n"));
        assert!(out.ends_with("Bye.\n"));
    }

    #[tokio::test]
    async fn test_end_of_input_quits() {
        let out = session("admin\n").await;
        assert!(out.contains("Password: "));
    }

    #[tokio::test]
    async fn test_bad_login_then_default_warning() {
        let out = session("admin\nwrong\nadmin\nadmin\n0\n\n").await;
        assert!(out.contains("Error: Invalid username or password"));
        assert!(out.contains("Welcome, admin (admin)."));
        assert!(out.contains("WARNING: the default admin password is in use"));
        assert!(out.contains("[4] Users"));
        assert!(out.contains("Goodbye, admin."));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<i64>("qty", " 3 ").unwrap(), 3);
        assert!(parse_number::<i64>("qty", "three").is_err());
    }
}

//! Users menu (admins) and password change (everyone).

use std::io::{self, BufRead, Write};

use till_core::{Role, User};

use super::Cli;
use crate::error::ServiceError;

impl<R: BufRead, W: Write> Cli<R, W> {
    pub(super) async fn users_menu(&mut self, actor: &User) -> io::Result<()> {
        loop {
            let choice = self.prompt.menu(
                "Users",
                &[
                    ("l", "List users"),
                    ("n", "New user"),
                    ("d", "Delete user"),
                    ("p", "Change password"),
                    ("b", "Back"),
                ],
            )?;

            match choice.as_str() {
                "l" => self.list_users(actor).await?,
                "n" => self.new_user(actor).await?,
                "d" => self.delete_user(actor).await?,
                "p" => {
                    let username = self.prompt.ask_or("Username", &actor.username)?;
                    self.change_password(actor, &username).await?;
                }
                "b" => return Ok(()),
                _ => self.prompt.say("Unknown choice.")?,
            }
        }
    }

    pub(super) async fn change_own_password(&mut self, actor: &User) -> io::Result<()> {
        self.change_password(actor, &actor.username).await
    }

    async fn change_password(&mut self, actor: &User, username: &str) -> io::Result<()> {
        let Some(password) = self.ask_new_password()? else {
            return Ok(());
        };
        let result = self
            .services
            .users
            .change_password(actor, username, &password)
            .await;
        if self.report(result)?.is_some() {
            self.prompt.say(format!("Password changed for {}.", username))?;
        }
        Ok(())
    }

    /// Asks twice; `None` when the entries differ.
    fn ask_new_password(&mut self) -> io::Result<Option<String>> {
        let password = self.prompt.ask("New password")?;
        let again = self.prompt.ask("Repeat password")?;
        if password != again {
            self.prompt.say("Passwords do not match.")?;
            return Ok(None);
        }
        Ok(Some(password))
    }

    async fn list_users(&mut self, actor: &User) -> io::Result<()> {
        let result = self.services.users.list_users(actor).await;
        let Some(users) = self.report(result)? else {
            return Ok(());
        };
        for user in &users {
            self.prompt.say(format!(
                "  {:<20} {:<8} since {}",
                user.username,
                user.role.as_str(),
                user.created_at.format("%Y-%m-%d")
            ))?;
        }
        Ok(())
    }

    async fn new_user(&mut self, actor: &User) -> io::Result<()> {
        let username = self.prompt.ask("Username")?;
        let role = self.prompt.ask_or("Role (admin/manager/cashier)", "cashier")?;
        let Some(role) = self.report(role.parse::<Role>().map_err(ServiceError::from))? else {
            return Ok(());
        };
        let Some(password) = self.ask_new_password()? else {
            return Ok(());
        };

        let result = self
            .services
            .users
            .create_user(actor, &username, &password, role)
            .await;
        if let Some(user) = self.report(result)? {
            self.prompt
                .say(format!("Created {} ({}).", user.username, user.role))?;
        }
        Ok(())
    }

    async fn delete_user(&mut self, actor: &User) -> io::Result<()> {
        let username = self.prompt.ask("Username")?;
        if !self.prompt.confirm(&format!("Delete user {}?", username))? {
            return Ok(());
        }

        let result = self.services.users.delete_user(actor, &username).await;
        if self.report(result)?.is_some() {
            self.prompt.say(format!("Deleted {}.", username))?;
        }
        Ok(())
    }
}

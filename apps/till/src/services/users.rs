//! # User Management Service
//!
//! Login, accounts and the first-run admin.
//!
//! ## Permissions
//! ```text
//! ┌──────────────────────┬───────┬─────────┬─────────┐
//! │ Operation            │ admin │ manager │ cashier │
//! ├──────────────────────┼───────┼─────────┼─────────┤
//! │ create / delete user │  yes  │   no    │   no    │
//! │ list users           │  yes  │   no    │   no    │
//! │ change own password  │  yes  │   yes   │   yes   │
//! │ change any password  │  yes  │   no    │   no    │
//! └──────────────────────┴───────┴─────────┴─────────┘
//! ```
//!
//! Passwords are stored as argon2 PHC strings and never leave this module.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::{debug, info, warn};

use till_core::validation::{validate_password, validate_username};
use till_core::{Role, User, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
use till_db::Database;

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        UserService { db }
    }

    /// Checks a username and password.
    ///
    /// Unknown users and wrong passwords both yield `Authentication`, and
    /// both cost one hash verification.
    pub async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<User> {
        let username = username.trim();
        let credentials = self.db.users().credentials(username).await?;

        match credentials {
            Some(credentials) if verify_password(password, &credentials.password_hash) => {
                info!(username = %username, role = %credentials.user.role, "User logged in");
                Ok(credentials.user)
            }
            Some(_) => {
                warn!(username = %username, "Failed login: wrong password");
                Err(ServiceError::Authentication)
            }
            None => {
                if let Some(dummy) = dummy_hash() {
                    let _ = verify_password(password, dummy);
                }
                warn!(username = %username, "Failed login: unknown user");
                Err(ServiceError::Authentication)
            }
        }
    }

    /// Creates an account. Admin only.
    pub async fn create_user(
        &self,
        actor: &User,
        username: &str,
        password: &str,
        role: Role,
    ) -> ServiceResult<User> {
        if !actor.role.is_admin() {
            return Err(ServiceError::forbidden("create users"));
        }
        let username = username.trim();
        validate_username(username)?;
        validate_password(password)?;

        let hash = hash_password(password)?;
        let user = self.db.users().insert(username, &hash, role).await?;

        info!(username = %user.username, role = %user.role, by = %actor.username, "User created");
        Ok(user)
    }

    /// Deletes an account. Admin only; nobody can delete themselves and the
    /// last admin cannot be deleted.
    pub async fn delete_user(&self, actor: &User, username: &str) -> ServiceResult<()> {
        if !actor.role.is_admin() {
            return Err(ServiceError::forbidden("delete users"));
        }
        let username = username.trim();
        if username == actor.username {
            return Err(ServiceError::SelfDeletion);
        }

        let users = self.db.users();
        let target = users
            .get_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", username))?;
        if target.id == actor.id {
            return Err(ServiceError::SelfDeletion);
        }

        if target.role.is_admin() && users.count_with_role(Role::Admin).await? <= 1 {
            return Err(ServiceError::validation("Cannot delete the last admin"));
        }

        users.delete(&target.id).await?;
        info!(username = %target.username, by = %actor.username, "User deleted");
        Ok(())
    }

    /// Sets a new password. Admins may change anyone's, others only their own.
    pub async fn change_password(
        &self,
        actor: &User,
        username: &str,
        new_password: &str,
    ) -> ServiceResult<()> {
        let username = username.trim();
        if !actor.role.is_admin() && username != actor.username {
            return Err(ServiceError::forbidden("change another user's password"));
        }
        validate_password(new_password)?;

        let users = self.db.users();
        let target = users
            .get_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", username))?;

        let hash = hash_password(new_password)?;
        users.update_password(&target.id, &hash).await?;

        info!(username = %target.username, by = %actor.username, "Password changed");
        Ok(())
    }

    /// All accounts by username. Admin only.
    pub async fn list_users(&self, actor: &User) -> ServiceResult<Vec<User>> {
        if !actor.role.is_admin() {
            return Err(ServiceError::forbidden("list users"));
        }
        Ok(self.db.users().list().await?)
    }

    /// Creates `admin`/`admin` when there are no accounts at all and returns
    /// it. Returns `None` otherwise.
    ///
    /// The default credentials are public; the operator must change them.
    pub async fn ensure_default_admin(&self) -> ServiceResult<Option<User>> {
        let users = self.db.users();
        if users.count().await? > 0 {
            debug!("Users exist, skipping default admin");
            return Ok(None);
        }

        let hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
        let admin = users
            .insert(DEFAULT_ADMIN_USERNAME, &hash, Role::Admin)
            .await?;

        warn!(
            username = %admin.username,
            "Created default admin account with the default password; change it"
        );
        Ok(Some(admin))
    }
}

/// Hashes a password for storage.
fn hash_password(password: &str) -> ServiceResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Storage(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verifies a password against its stored hash. Malformed hashes never match.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hash checked against for unknown usernames.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("till-dummy-password").ok())
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_db::DbConfig;

    async fn setup() -> (UserService, User) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let users = UserService::new(db);
        let admin = users.ensure_default_admin().await.unwrap().unwrap();
        (users, admin)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "not-a-hash"));
    }

    #[tokio::test]
    async fn test_default_admin_seeded_once() {
        let (users, admin) = setup().await;
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.role, Role::Admin);

        assert!(users.ensure_default_admin().await.unwrap().is_none());

        let logged_in = users.authenticate("admin", "admin").await.unwrap();
        assert_eq!(logged_in.id, admin.id);
    }

    #[tokio::test]
    async fn test_authentication_failures_look_alike() {
        let (users, _) = setup().await;

        let wrong = users.authenticate("admin", "nope").await.unwrap_err();
        let unknown = users.authenticate("ghost", "admin").await.unwrap_err();

        assert!(matches!(wrong, ServiceError::Authentication));
        assert!(matches!(unknown, ServiceError::Authentication));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_create_user_rules() {
        let (users, admin) = setup().await;

        let cashier = users
            .create_user(&admin, "carol", "pass1", Role::Cashier)
            .await
            .unwrap();
        assert_eq!(cashier.role, Role::Cashier);

        let forbidden = users
            .create_user(&cashier, "dave", "pass1", Role::Cashier)
            .await
            .unwrap_err();
        assert!(matches!(forbidden, ServiceError::Authorization { .. }));

        let duplicate = users
            .create_user(&admin, "carol", "other", Role::Manager)
            .await
            .unwrap_err();
        assert!(matches!(duplicate, ServiceError::Validation(_)));

        let short = users
            .create_user(&admin, "erin", "abc", Role::Cashier)
            .await
            .unwrap_err();
        assert!(matches!(short, ServiceError::Validation(_)));

        let empty = users
            .create_user(&admin, "  ", "pass1", Role::Cashier)
            .await
            .unwrap_err();
        assert!(matches!(empty, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_user_rules() {
        let (users, admin) = setup().await;
        let manager = users
            .create_user(&admin, "mia", "pass1", Role::Manager)
            .await
            .unwrap();

        let own = users.delete_user(&admin, "admin").await.unwrap_err();
        assert!(matches!(own, ServiceError::SelfDeletion));

        let forbidden = users.delete_user(&manager, "admin").await.unwrap_err();
        assert!(matches!(forbidden, ServiceError::Authorization { .. }));

        let missing = users.delete_user(&admin, "ghost").await.unwrap_err();
        assert!(matches!(missing, ServiceError::NotFound { .. }));

        users.delete_user(&admin, "mia").await.unwrap();
        let names: Vec<String> = users
            .list_users(&admin)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["admin"]);
    }

    #[tokio::test]
    async fn test_last_admin_is_kept() {
        let (users, admin) = setup().await;
        let second = users
            .create_user(&admin, "root", "pass1", Role::Admin)
            .await
            .unwrap();

        users.delete_user(&second, "admin").await.unwrap();

        // `second` is now the only admin and cannot delete itself either way.
        let err = users.delete_user(&second, "root").await.unwrap_err();
        assert!(matches!(err, ServiceError::SelfDeletion));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (users, admin) = setup().await;
        let cashier = users
            .create_user(&admin, "carol", "pass1", Role::Cashier)
            .await
            .unwrap();

        users.change_password(&cashier, "carol", "pass2").await.unwrap();
        assert!(users.authenticate("carol", "pass2").await.is_ok());

        let forbidden = users.change_password(&cashier, "admin", "hijack").await.unwrap_err();
        assert!(matches!(forbidden, ServiceError::Authorization { .. }));

        users.change_password(&admin, "carol", "pass3").await.unwrap();
        assert!(users.authenticate("carol", "pass2").await.is_err());

        let list = users.list_users(&cashier).await.unwrap_err();
        assert!(matches!(list, ServiceError::Authorization { .. }));
    }
}

/// Database models for Enclave
///
/// This module contains all database models and their query helpers.
///
/// # Models
///
/// - `user`: User accounts, roles, and membership stages
/// - `survey_log`: Membership application submissions and their decisions
///
/// # Example
///
/// ```no_run
/// use enclave_shared::models::user::{CreateUser, User};
/// use enclave_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     username: "jdoe".to_string(),
///     email: "user@example.com".to_string(),
///     phone: None,
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod survey_log;
pub mod user;

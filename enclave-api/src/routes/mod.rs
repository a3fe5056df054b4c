/// API route handlers
///
/// - `health`: service health check
/// - `auth`: registration, login, token refresh
/// - `membership`: applicant-facing submission and status endpoints
/// - `admin`: review queue and decisions
/// - `members`: member-only surface behind the stage gate

pub mod admin;
pub mod auth;
pub mod health;
pub mod members;
pub mod membership;

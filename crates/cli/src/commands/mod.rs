//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Name of the primary database URL variable.
pub const DATABASE_URL_VAR: &str = "POLA_DATABASE_URL";

/// Read the database URL from the environment (loading `.env` first),
/// falling back to the generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns the missing variable's name if neither is set.
pub fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var(DATABASE_URL_VAR)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| DATABASE_URL_VAR)
}

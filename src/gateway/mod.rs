//! Table gateways. Each function runs one parameterised statement (or a short
//! fixed series inside a transaction) against a borrowed connection.

pub mod blocks;
pub mod directory;
pub mod offerings;
pub mod selections;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Invalid(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Db(_) => "db_query_failed",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Invalid(_) => "bad_params",
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Builds `?, ?, ?` for an `IN (...)` list of `n` bound values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

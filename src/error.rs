use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrderError>;

/// Failure taxonomy for order placement and catalog access.
///
/// `Validation` is raised before any store interaction. `ProductNotFound` and
/// `InsufficientStock` are raised inside a unit of work and abort the whole
/// transaction. `Store` wraps infrastructure failures and is distinct from
/// business rejections.
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),
    #[error("product {0} does not exist")]
    ProductNotFound(i64),
    #[error("insufficient stock for {name} ({remaining} left)")]
    InsufficientStock { name: String, remaining: i64 },
    #[error("order {0} does not exist")]
    OrderNotFound(i64),
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("store is shut down")]
    Closed,
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orderflow_core::ProductId;

/// One line whose requested quantity exceeds available stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub requested: u64,
    pub available: u64,
}

impl core::fmt::Display for StockShortfall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} (requested {}, available {})",
            self.product_id, self.requested, self.available
        )
    }
}

/// Reasons an order is rejected.
///
/// None of these are retried by the workflow. Every variant except
/// `StockConflict` aborts before anything is written; a `StockConflict` order
/// was created and then removed again, leaving stock as the concurrent writer
/// set it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("customer not found")]
    CustomerNotFound,

    #[error("could not find any products with the given ids")]
    NoProductsFound,

    #[error("could not find products: {}", join(.0))]
    ProductsNotFound(Vec<ProductId>),

    #[error("insufficient stock for: {}", join(.0))]
    InsufficientStock(Vec<StockShortfall>),

    /// Zero, or a duplicate-id sum that does not fit in `u64`.
    #[error("invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: ProductId },

    /// Stock moved between validation and update; the created order was removed.
    #[error("stock changed concurrently for: {}", join(.0))]
    StockConflict(Vec<ProductId>),
}

fn join<T: core::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

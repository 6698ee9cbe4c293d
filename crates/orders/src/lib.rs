//! Orders domain module.
//!
//! This crate contains the business rules for creating an order, implemented
//! purely as deterministic domain logic (no IO, no storage). Repositories and
//! the workflow that drives them live in `orderflow-infra`.

pub mod error;
pub mod order;
pub mod plan;

pub use error::{OrderError, StockShortfall};
pub use order::{LineItemRequest, NewOrder, Order, OrderLineItem, OrderRequest};
pub use plan::{OrderPlan, StockGuard, merge_line_items};

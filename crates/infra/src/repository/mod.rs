//! Repository boundary for the order-creation workflow.
//!
//! Customers, products and orders are owned by external stores. The workflow
//! only sees these capability traits, so any backend (in-memory, Postgres, ...)
//! can be swapped in without touching workflow logic.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use thiserror::Error;

use orderflow_core::{CustomerId, OrderId, ProductId};
use orderflow_customers::Customer;
use orderflow_orders::{NewOrder, Order};
use orderflow_products::{Product, StockUpdate};

pub use in_memory::{InMemoryCustomerRepository, InMemoryOrderRepository, InMemoryProductRepository};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresCustomerRepository, PostgresOrderRepository, PostgresProductRepository};

/// Repository operation error.
///
/// These are **infrastructure errors**. The workflow propagates them unchanged,
/// except for [`RepositoryError::Conflict`] which it answers with compensation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A guarded stock update found a different quantity than expected.
    #[error("stock changed concurrently for {} product(s)", .0.len())]
    Conflict(Vec<ProductId>),

    /// A record the operation needs to modify does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Stored data could not be mapped back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Backend failure (lock poisoning, IO, ...).
    #[error("storage failure: {0}")]
    Storage(String),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Customer Lookup.
#[async_trait::async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;
}

/// Product Lookup / Stock Store.
#[async_trait::async_trait]
pub trait ProductRepository: Send + Sync {
    /// Resolve every product whose id is in `ids`.
    ///
    /// Unknown ids are omitted from the result, never reported as errors.
    async fn find_all_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Overwrite stock levels.
    ///
    /// Implementations must apply the batch atomically: either every update is
    /// written or none is. Updates carrying `ExpectedQuantity::Exact` fail the
    /// whole batch with [`RepositoryError::Conflict`] when stored stock differs.
    async fn update_quantity(&self, updates: Vec<StockUpdate>) -> Result<(), RepositoryError>;
}

/// Order Store.
#[async_trait::async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order and return it with its assigned id.
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Delete an order (compensation when its stock update is rejected).
    async fn remove(&self, id: OrderId) -> Result<(), RepositoryError>;
}

#[async_trait::async_trait]
impl<S> CustomerRepository for Arc<S>
where
    S: CustomerRepository + ?Sized,
{
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        (**self).find_by_id(id).await
    }
}

#[async_trait::async_trait]
impl<S> ProductRepository for Arc<S>
where
    S: ProductRepository + ?Sized,
{
    async fn find_all_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        (**self).find_all_by_id(ids).await
    }

    async fn update_quantity(&self, updates: Vec<StockUpdate>) -> Result<(), RepositoryError> {
        (**self).update_quantity(updates).await
    }
}

#[async_trait::async_trait]
impl<S> OrderRepository for Arc<S>
where
    S: OrderRepository + ?Sized,
{
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        (**self).create(order).await
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn remove(&self, id: OrderId) -> Result<(), RepositoryError> {
        (**self).remove(id).await
    }
}

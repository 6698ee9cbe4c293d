//! Order creation pipeline (application-level orchestration).
//!
//! ```text
//! OrderRequest
//!   ↓
//! 1. Look up customer                  (CustomerNotFound)
//!   ↓
//! 2. Normalize lines (pure)            (InvalidQuantity)
//!   ↓
//! 3. Batch-resolve products            (NoProductsFound / ProductsNotFound)
//!   ↓
//! 4. Check stock + snapshot prices     (InsufficientStock)
//!   ↓
//! 5. Persist order                     (single durability point)
//!   ↓
//! 6. Batch-update stock from the persisted lines
//! ```
//!
//! Every step is awaited before the next. Nothing is retried; a failing check
//! aborts before any write, and stock is only touched after the order exists.
//!
//! With [`orderflow_orders::StockGuard::CompareAndSwap`] a concurrent stock change between steps
//! 3 and 6 is detected by the product store. The just-created order is then
//! removed and the call fails with [`OrderError::StockConflict`]. If removing
//! it fails too, the call fails with [`WorkflowError::CompensationFailed`] and
//! the order is left behind without its stock decrement.

use thiserror::Error;

use orderflow_core::{OrderId, ProductId};
use orderflow_orders::{
    Order, OrderError, OrderPlan, OrderRequest, merge_line_items,
};

use crate::config::WorkflowConfig;
use crate::repository::{CustomerRepository, OrderRepository, ProductRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The request was refused. No order remains and stock is unchanged.
    #[error(transparent)]
    Rejected(#[from] OrderError),

    /// A repository call failed; propagated unchanged.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Stock changed concurrently and the created order could not be removed.
    /// The order is still persisted while its stock was never decremented.
    #[error("order {order_id} left in place after a stock conflict: {source}")]
    CompensationFailed {
        order_id: OrderId,
        conflict: Vec<ProductId>,
        #[source]
        source: RepositoryError,
    },
}

impl WorkflowError {
    pub fn rejection(&self) -> Option<&OrderError> {
        match self {
            WorkflowError::Rejected(err) => Some(err),
            WorkflowError::Repository(_) | WorkflowError::CompensationFailed { .. } => None,
        }
    }
}

fn reject(err: OrderError) -> WorkflowError {
    tracing::warn!(reason = %err, "order rejected");
    WorkflowError::Rejected(err)
}

/// Validates and commits customer orders against finite stock.
///
/// Generic over the three collaborators so tests run against in-memory stores
/// and production against Postgres without changing this code.
#[derive(Debug)]
pub struct OrderCreationWorkflow<C, P, O> {
    customers: C,
    products: P,
    orders: O,
    config: WorkflowConfig,
}

impl<C, P, O> OrderCreationWorkflow<C, P, O> {
    pub fn new(customers: C, products: P, orders: O) -> Self {
        Self {
            customers,
            products,
            orders,
            config: WorkflowConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn into_parts(self) -> (C, P, O) {
        (self.customers, self.products, self.orders)
    }
}

impl<C, P, O> OrderCreationWorkflow<C, P, O>
where
    C: CustomerRepository,
    P: ProductRepository,
    O: OrderRepository,
{
    /// Create an order if the customer exists, every product exists and every
    /// quantity is in stock; then decrement stock by the ordered quantities.
    #[tracing::instrument(
        name = "create_order",
        skip(self, request),
        fields(customer_id = %request.customer_id, lines = request.items.len())
    )]
    pub async fn create_order(&self, request: OrderRequest) -> Result<Order, WorkflowError> {
        let customer = self
            .customers
            .find_by_id(request.customer_id)
            .await?
            .ok_or_else(|| reject(OrderError::CustomerNotFound))?;

        let items = merge_line_items(&request.items).map_err(reject)?;
        if items.is_empty() {
            return Err(reject(OrderError::NoProductsFound));
        }

        let ids: Vec<ProductId> = items.iter().map(|item| item.product_id).collect();
        let resolved = self.products.find_all_by_id(&ids).await?;
        tracing::debug!(requested = ids.len(), resolved = resolved.len(), "products resolved");

        let plan = OrderPlan::prepare(customer, &items, resolved).map_err(reject)?;

        let order = self.orders.create(plan.new_order()).await?;

        let updates = plan.stock_updates(&order, self.config.stock_guard);
        match self.products.update_quantity(updates).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(product_ids)) => {
                return Err(self.compensate(&order, product_ids).await);
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id(),
            lines = order.line_items.len(),
            total = order.total(),
            "order created"
        );

        Ok(order)
    }

    /// Undo the order after its stock update lost a race.
    async fn compensate(&self, order: &Order, conflict: Vec<ProductId>) -> WorkflowError {
        tracing::error!(
            order_id = %order.id,
            guard = ?self.config.stock_guard,
            conflicts = conflict.len(),
            "stock changed concurrently; removing order"
        );

        match self.orders.remove(order.id).await {
            Ok(()) => reject(OrderError::StockConflict(conflict)),
            Err(source) => {
                tracing::error!(
                    order_id = %order.id,
                    error = %source,
                    "failed to remove order after stock conflict"
                );
                WorkflowError::CompensationFailed {
                    order_id: order.id,
                    conflict,
                    source,
                }
            }
        }
    }
}

//! In-memory repositories.
//!
//! Intended for tests/dev. Not optimized for performance.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use orderflow_core::{CustomerId, OrderId, ProductId};
use orderflow_customers::Customer;
use orderflow_orders::{NewOrder, Order};
use orderflow_products::{Product, StockUpdate};

use super::{CustomerRepository, OrderRepository, ProductRepository, RepositoryError};

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<CustomerId, Customer>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a customer.
    pub fn insert(&self, customer: Customer) {
        if let Ok(mut map) = self.customers.write() {
            map.insert(customer.id_typed(), customer);
        }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let map = self.customers.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product.
    pub fn insert(&self, product: Product) {
        if let Ok(mut map) = self.products.write() {
            map.insert(product.id_typed(), product);
        }
    }

    pub fn get(&self, id: ProductId) -> Option<Product> {
        let map = self.products.read().ok()?;
        map.get(&id).cloned()
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_all_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let map = self.products.read().map_err(|_| poisoned())?;
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }

    async fn update_quantity(&self, updates: Vec<StockUpdate>) -> Result<(), RepositoryError> {
        let mut map = self.products.write().map_err(|_| poisoned())?;

        // Validate the whole batch before writing anything.
        let mut conflicts = Vec::new();
        for update in &updates {
            let current = map
                .get(&update.product_id)
                .ok_or_else(|| RepositoryError::NotFound(format!("product {}", update.product_id)))?;
            if !update.expected.matches(current.quantity()) {
                conflicts.push(update.product_id);
            }
        }
        if !conflicts.is_empty() {
            return Err(RepositoryError::Conflict(conflicts));
        }

        for update in updates {
            if let Some(product) = map.get_mut(&update.product_id) {
                *product = product.with_quantity(update.quantity);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: OrderId) -> Option<Order> {
        let map = self.orders.read().ok()?;
        map.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.orders.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let order = Order::from_new(OrderId::new(), order, Utc::now());
        let mut map = self.orders.write().map_err(|_| poisoned())?;
        map.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let map = self.orders.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn remove(&self, id: OrderId) -> Result<(), RepositoryError> {
        let mut map = self.orders.write().map_err(|_| poisoned())?;
        map.remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_core::ExpectedQuantity;

    fn product(quantity: u64) -> Product {
        Product::new(ProductId::new(), "Widget", 10, quantity).unwrap()
    }

    #[tokio::test]
    async fn find_all_by_id_omits_unknown_ids() {
        let repo = InMemoryProductRepository::new();
        let known = product(3);
        repo.insert(known.clone());

        let found = repo
            .find_all_by_id(&[ProductId::new(), known.id_typed()])
            .await
            .unwrap();

        assert_eq!(found, vec![known]);
    }

    #[tokio::test]
    async fn guarded_batch_is_all_or_nothing() {
        let repo = InMemoryProductRepository::new();
        let a = product(5);
        let b = product(2);
        repo.insert(a.clone());
        repo.insert(b.clone());

        let err = repo
            .update_quantity(vec![
                StockUpdate::guarded(a.id_typed(), 5, 1),
                StockUpdate::guarded(b.id_typed(), 3, 0),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict(ids) if ids == vec![b.id_typed()]));
        assert_eq!(repo.get(a.id_typed()).unwrap().quantity(), 5);
        assert_eq!(repo.get(b.id_typed()).unwrap().quantity(), 2);
    }

    #[tokio::test]
    async fn overwrite_ignores_current_level() {
        let repo = InMemoryProductRepository::new();
        let a = product(5);
        repo.insert(a.clone());

        repo.update_quantity(vec![StockUpdate {
            product_id: a.id_typed(),
            quantity: 42,
            expected: ExpectedQuantity::Any,
        }])
        .await
        .unwrap();

        assert_eq!(repo.get(a.id_typed()).unwrap().quantity(), 42);
    }

    #[tokio::test]
    async fn updating_unknown_product_is_not_found() {
        let repo = InMemoryProductRepository::new();
        for update in [
            StockUpdate::overwrite(ProductId::new(), 1),
            StockUpdate::guarded(ProductId::new(), 3, 1),
        ] {
            let err = repo.update_quantity(vec![update]).await.unwrap_err();
            assert!(matches!(err, RepositoryError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn removing_missing_order_is_not_found() {
        let repo = InMemoryOrderRepository::new();
        let err = repo.remove(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}

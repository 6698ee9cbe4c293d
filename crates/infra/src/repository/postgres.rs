//! Postgres-backed repositories.
//!
//! Schema lives in `migrations/0001_orderflow.sql` and can be applied with
//! [`apply_schema`]. Quantities and prices are stored as `BIGINT` and checked
//! on the way back into unsigned domain values.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::Span;
use uuid::Uuid;

use orderflow_core::{CustomerId, OrderId, ProductId};
use orderflow_customers::Customer;
use orderflow_orders::{NewOrder, Order, OrderLineItem};
use orderflow_products::{Product, StockUpdate};

use super::{CustomerRepository, OrderRepository, ProductRepository, RepositoryError};

/// DDL for every table the repositories use.
pub const SCHEMA: &str = include_str!("../../migrations/0001_orderflow.sql");

/// Create the tables if they do not exist yet.
pub async fn apply_schema(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}

fn to_db(value: u64, what: &str) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| RepositoryError::Corrupt(format!("{what} {value} exceeds BIGINT")))
}

fn from_db(value: i64, what: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| RepositoryError::Corrupt(format!("negative {what}: {value}")))
}

fn customer_from_row(row: &PgRow) -> Result<Customer, RepositoryError> {
    let id: Uuid = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let email: String = row.try_get("email")?;
    Customer::new(CustomerId::from_uuid(id), name, email)
        .map_err(|e| RepositoryError::Corrupt(format!("customer {id}: {e}")))
}

fn product_from_row(row: &PgRow) -> Result<Product, RepositoryError> {
    let id: Uuid = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let price = from_db(row.try_get("price")?, "price")?;
    let quantity = from_db(row.try_get("quantity")?, "quantity")?;
    Product::new(ProductId::from_uuid(id), name, price, quantity)
        .map_err(|e| RepositoryError::Corrupt(format!("product {id}: {e}")))
}

pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a customer record.
    pub async fn upsert(&self, customer: &Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (id)
            DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email
            "#,
        )
        .bind(Uuid::from(customer.id_typed()))
        .bind(customer.name())
        .bind(customer.email())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    #[tracing::instrument(name = "postgres", skip(self), fields(operation))]
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Span::current().record("operation", "find_customer");

        let row = sqlx::query("SELECT id, name, email FROM customers WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(customer_from_row).transpose()
    }
}

pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a catalog product.
    pub async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                quantity = EXCLUDED.quantity,
                updated_at = NOW()
            "#,
        )
        .bind(Uuid::from(product.id_typed()))
        .bind(product.name())
        .bind(to_db(product.price(), "price")?)
        .bind(to_db(product.quantity(), "quantity")?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductRepository for PostgresProductRepository {
    #[tracing::instrument(name = "postgres", skip_all, fields(operation, ids = ids.len()))]
    async fn find_all_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        Span::current().record("operation", "find_products");

        if ids.is_empty() {
            return Ok(vec![]);
        }

        let uuids: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let rows = sqlx::query("SELECT id, name, price, quantity FROM products WHERE id = ANY($1)")
            .bind(uuids)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(product_from_row).collect()
    }

    #[tracing::instrument(name = "postgres", skip_all, fields(operation, updates = updates.len()))]
    async fn update_quantity(&self, updates: Vec<StockUpdate>) -> Result<(), RepositoryError> {
        Span::current().record("operation", "update_stock");

        let mut tx = self.pool.begin().await?;

        // Lock and validate every row before writing any of them. Dropping the
        // transaction on an early return rolls it back.
        let mut conflicts = Vec::new();
        for update in &updates {
            let row = sqlx::query("SELECT quantity FROM products WHERE id = $1 FOR UPDATE")
                .bind(Uuid::from(update.product_id))
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::NotFound(format!("product {}", update.product_id)))?;
            let current = from_db(row.try_get("quantity")?, "quantity")?;
            if !update.expected.matches(current) {
                conflicts.push(update.product_id);
            }
        }

        if !conflicts.is_empty() {
            tx.rollback().await?;
            return Err(RepositoryError::Conflict(conflicts));
        }

        for update in &updates {
            sqlx::query("UPDATE products SET quantity = $2, updated_at = NOW() WHERE id = $1")
                .bind(Uuid::from(update.product_id))
                .bind(to_db(update.quantity, "quantity")?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for PostgresOrderRepository {
    #[tracing::instrument(name = "postgres", skip_all, fields(operation, lines = order.line_items.len()))]
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        Span::current().record("operation", "create_order");

        let id = OrderId::new();
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO orders (id, customer_id, created_at) VALUES ($1, $2, $3)")
            .bind(Uuid::from(id))
            .bind(Uuid::from(order.customer.id_typed()))
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        for (position, line) in order.line_items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Corrupt(format!("line position {position} exceeds INTEGER")))?;
            sqlx::query(
                r#"
                INSERT INTO order_line_items (order_id, position, product_id, quantity, price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::from(id))
            .bind(position)
            .bind(Uuid::from(line.product_id))
            .bind(to_db(line.quantity, "quantity")?)
            .bind(to_db(line.price, "price")?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Order::from_new(id, order, created_at))
    }

    #[tracing::instrument(name = "postgres", skip(self), fields(operation))]
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Span::current().record("operation", "find_order");

        let row = sqlx::query(
            r#"
            SELECT o.created_at, c.id, c.name, c.email
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE o.id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let customer = customer_from_row(&row)?;

        let lines = sqlx::query(
            r#"
            SELECT product_id, quantity, price
            FROM order_line_items
            WHERE order_id = $1
            ORDER BY position
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_all(&self.pool)
        .await?;

        let line_items = lines
            .iter()
            .map(|line| {
                Ok(OrderLineItem {
                    product_id: ProductId::from_uuid(line.try_get("product_id")?),
                    quantity: from_db(line.try_get("quantity")?, "quantity")?,
                    price: from_db(line.try_get("price")?, "price")?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(Order {
            id,
            customer,
            line_items,
            created_at,
        }))
    }

    #[tracing::instrument(name = "postgres", skip(self), fields(operation))]
    async fn remove(&self, id: OrderId) -> Result<(), RepositoryError> {
        Span::current().record("operation", "remove_order");

        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("order {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::order_workflow::OrderCreationWorkflow;
    use orderflow_orders::{LineItemRequest, OrderError, OrderRequest};

    #[tokio::test]
    #[ignore = "requires a Postgres instance at DATABASE_URL"]
    async fn workflow_round_trip_against_postgres() {
        let pool = DatabaseConfig::from_env().unwrap().connect().await.unwrap();
        apply_schema(&pool).await.unwrap();

        let customers = PostgresCustomerRepository::new(pool.clone());
        let products = PostgresProductRepository::new(pool.clone());
        let orders = PostgresOrderRepository::new(pool.clone());

        let customer = Customer::new(
            CustomerId::new(),
            "Postgres Customer",
            format!("{}@example.com", Uuid::now_v7()),
        )
        .unwrap();
        let product = Product::new(ProductId::new(), "Crate", 250, 4).unwrap();
        customers.upsert(&customer).await.unwrap();
        products.upsert(&product).await.unwrap();

        let workflow = OrderCreationWorkflow::new(customers, products, orders);
        let order = workflow
            .create_order(OrderRequest::new(
                customer.id_typed(),
                [LineItemRequest::new(product.id_typed(), 4)],
            ))
            .await
            .unwrap();

        let (_, products, orders) = workflow.into_parts();
        let stored = orders.find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.line_items, order.line_items);

        let remaining = products.find_all_by_id(&[product.id_typed()]).await.unwrap();
        assert_eq!(remaining[0].quantity(), 0);

        let workflow = OrderCreationWorkflow::new(
            PostgresCustomerRepository::new(pool.clone()),
            products,
            orders,
        );
        let err = workflow
            .create_order(OrderRequest::new(
                customer.id_typed(),
                [LineItemRequest::new(product.id_typed(), 1)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err.rejection(), Some(OrderError::InsufficientStock(_))));
    }

    #[tokio::test]
    #[ignore = "requires a Postgres instance at DATABASE_URL"]
    async fn guarded_stock_updates_match_the_in_memory_store() {
        let pool = DatabaseConfig::from_env().unwrap().connect().await.unwrap();
        apply_schema(&pool).await.unwrap();
        let products = PostgresProductRepository::new(pool);

        let product = Product::new(ProductId::new(), "Guarded", 100, 5).unwrap();
        products.upsert(&product).await.unwrap();

        let err = products
            .update_quantity(vec![StockUpdate::guarded(ProductId::new(), 3, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));

        let err = products
            .update_quantity(vec![
                StockUpdate::guarded(product.id_typed(), 5, 4),
                StockUpdate::guarded(product.id_typed(), 9, 0),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(ids) if ids == vec![product.id_typed()]));

        let stored = products.find_all_by_id(&[product.id_typed()]).await.unwrap();
        assert_eq!(stored[0].quantity(), 5);
    }
}

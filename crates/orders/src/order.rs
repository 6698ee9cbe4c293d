use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{CustomerId, Entity, OrderId, ProductId, ValueObject};
use orderflow_customers::Customer;

/// Caller-supplied request line: which product and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub quantity: u64,
}

impl LineItemRequest {
    pub fn new(product_id: ProductId, quantity: u64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

impl ValueObject for LineItemRequest {}

/// Input to order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_id: CustomerId,
    pub items: Vec<LineItemRequest>,
}

impl OrderRequest {
    pub fn new(customer_id: CustomerId, items: impl IntoIterator<Item = LineItemRequest>) -> Self {
        Self {
            customer_id,
            items: items.into_iter().collect(),
        }
    }
}

/// Order line with the product price captured at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub quantity: u64,
    /// Price in smallest currency unit, snapshotted from the product.
    pub price: u64,
}

impl OrderLineItem {
    pub fn total(&self) -> u64 {
        self.quantity.saturating_mul(self.price)
    }
}

impl ValueObject for OrderLineItem {}

/// Payload handed to the order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer: Customer,
    pub line_items: Vec<OrderLineItem>,
}

/// A persisted order, as returned by the order store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: Customer,
    pub line_items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Persist-side constructor used by order stores.
    pub fn from_new(id: OrderId, new_order: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer: new_order.customer,
            line_items: new_order.line_items,
            created_at,
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer.id_typed()
    }

    pub fn total(&self) -> u64 {
        self.line_items
            .iter()
            .fold(0u64, |acc, line| acc.saturating_add(line.total()))
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Customer {
        Customer::new(CustomerId::new(), "Grace", "grace@example.com").unwrap()
    }

    #[test]
    fn order_total_sums_line_totals() {
        let order = Order::from_new(
            OrderId::new(),
            NewOrder {
                customer: customer(),
                line_items: vec![
                    OrderLineItem {
                        product_id: ProductId::new(),
                        quantity: 3,
                        price: 10,
                    },
                    OrderLineItem {
                        product_id: ProductId::new(),
                        quantity: 2,
                        price: 20,
                    },
                ],
            },
            Utc::now(),
        );

        assert_eq!(order.total(), 70);
    }

    #[test]
    fn line_total_saturates_instead_of_overflowing() {
        let line = OrderLineItem {
            product_id: ProductId::new(),
            quantity: u64::MAX,
            price: 2,
        };
        assert_eq!(line.total(), u64::MAX);
    }

    #[test]
    fn from_new_keeps_customer_and_lines() {
        let customer = customer();
        let line = OrderLineItem {
            product_id: ProductId::new(),
            quantity: 1,
            price: 5,
        };
        let order = Order::from_new(
            OrderId::new(),
            NewOrder {
                customer: customer.clone(),
                line_items: vec![line],
            },
            Utc::now(),
        );

        assert_eq!(order.customer_id(), customer.id_typed());
        assert_eq!(order.line_items, vec![line]);
    }
}

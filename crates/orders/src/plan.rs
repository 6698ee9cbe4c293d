//! Pure order planning: request normalization, validation against resolved
//! products, price snapshotting and post-creation stock levels.
//!
//! Every function here is deterministic and side-effect free. The workflow in
//! `orderflow-infra` feeds it repository results and persists what it returns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use orderflow_core::ProductId;
use orderflow_customers::Customer;
use orderflow_products::{Product, StockUpdate};

use crate::error::{OrderError, StockShortfall};
use crate::order::{LineItemRequest, NewOrder, Order, OrderLineItem};

/// How stock updates guard against concurrent writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockGuard {
    /// Update only if stock still equals the level read during validation.
    #[default]
    CompareAndSwap,
    /// Overwrite stock unconditionally.
    Overwrite,
}

/// Reject non-positive quantities and fold repeated product ids into one line.
///
/// Quantities of repeated ids are summed; lines keep the order in which each id
/// first appears. A sum that overflows `u64` is rejected as well.
pub fn merge_line_items(items: &[LineItemRequest]) -> Result<Vec<LineItemRequest>, OrderError> {
    let mut merged: Vec<LineItemRequest> = Vec::with_capacity(items.len());
    let mut positions: HashMap<ProductId, usize> = HashMap::with_capacity(items.len());

    for item in items {
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: item.product_id,
            });
        }

        match positions.get(&item.product_id) {
            Some(&idx) => {
                merged[idx].quantity = merged[idx].quantity.checked_add(item.quantity).ok_or(
                    OrderError::InvalidQuantity {
                        product_id: item.product_id,
                    },
                )?;
            }
            None => {
                positions.insert(item.product_id, merged.len());
                merged.push(*item);
            }
        }
    }

    Ok(merged)
}

/// A validated order, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    customer: Customer,
    line_items: Vec<OrderLineItem>,
    /// Stock level of each ordered product as read during validation.
    observed: HashMap<ProductId, u64>,
}

impl OrderPlan {
    /// Validate `items` against the products the lookup resolved.
    ///
    /// Checks run in order and the first failure wins: nothing resolved,
    /// some ids unresolved, then stock sufficiency. Products are matched to
    /// lines by id; `resolved` may be in any order and may contain extras.
    pub fn prepare(
        customer: Customer,
        items: &[LineItemRequest],
        resolved: Vec<Product>,
    ) -> Result<Self, OrderError> {
        let items = merge_line_items(items)?;

        if items.is_empty() || resolved.is_empty() {
            return Err(OrderError::NoProductsFound);
        }

        let catalog: HashMap<ProductId, Product> = resolved
            .into_iter()
            .map(|p| (p.id_typed(), p))
            .collect();

        let missing: Vec<ProductId> = items
            .iter()
            .filter(|item| !catalog.contains_key(&item.product_id))
            .map(|item| item.product_id)
            .collect();
        if !missing.is_empty() {
            return Err(OrderError::ProductsNotFound(missing));
        }

        let mut shortfalls = Vec::new();
        let mut line_items = Vec::with_capacity(items.len());
        let mut observed = HashMap::with_capacity(items.len());

        for item in &items {
            let Some(product) = catalog.get(&item.product_id) else {
                continue;
            };

            if !product.can_fulfil(item.quantity) {
                shortfalls.push(StockShortfall {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.quantity(),
                });
                continue;
            }

            line_items.push(OrderLineItem {
                product_id: item.product_id,
                quantity: item.quantity,
                price: product.price(),
            });
            observed.insert(item.product_id, product.quantity());
        }

        if !shortfalls.is_empty() {
            return Err(OrderError::InsufficientStock(shortfalls));
        }

        Ok(Self {
            customer,
            line_items,
            observed,
        })
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    /// Payload for the order store.
    pub fn new_order(&self) -> NewOrder {
        NewOrder {
            customer: self.customer.clone(),
            line_items: self.line_items.clone(),
        }
    }

    /// New stock levels for every product in the **persisted** order.
    ///
    /// Quantities come from `order` rather than the request so that any
    /// normalization done by the store is honored. Lines the store split are
    /// summed per product; products this plan never observed are skipped.
    pub fn stock_updates(&self, order: &Order, guard: StockGuard) -> Vec<StockUpdate> {
        let mut ordered: Vec<(ProductId, u64)> = Vec::with_capacity(order.line_items.len());
        for line in &order.line_items {
            match ordered.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, qty)) => *qty = qty.saturating_add(line.quantity),
                None => ordered.push((line.product_id, line.quantity)),
            }
        }

        ordered
            .into_iter()
            .filter_map(|(product_id, quantity)| {
                let prior = *self.observed.get(&product_id)?;
                let remaining = prior.saturating_sub(quantity);
                Some(match guard {
                    StockGuard::CompareAndSwap => StockUpdate::guarded(product_id, prior, remaining),
                    StockGuard::Overwrite => StockUpdate::overwrite(product_id, remaining),
                })
            })
            .collect()
    }
}

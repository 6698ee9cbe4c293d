//! Product catalog domain module.
//!
//! Products carry a price and a finite stock level. Stock is only ever changed
//! through [`StockUpdate`] batches issued after an order is created.

pub mod product;
pub mod stock;

pub use product::Product;
pub use stock::StockUpdate;

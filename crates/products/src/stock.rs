use serde::{Deserialize, Serialize};

use orderflow_core::{ExpectedQuantity, ProductId, ValueObject};

/// Absolute stock level to write for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub product_id: ProductId,
    /// New stock level (not a delta).
    pub quantity: u64,
    pub expected: ExpectedQuantity,
}

impl StockUpdate {
    /// Unconditional overwrite.
    pub fn overwrite(product_id: ProductId, quantity: u64) -> Self {
        Self {
            product_id,
            quantity,
            expected: ExpectedQuantity::Any,
        }
    }

    /// Overwrite only if stock still equals `observed`.
    pub fn guarded(product_id: ProductId, observed: u64, quantity: u64) -> Self {
        Self {
            product_id,
            quantity,
            expected: ExpectedQuantity::Exact(observed),
        }
    }
}

impl ValueObject for StockUpdate {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarded_update_expects_the_observed_level() {
        let id = ProductId::new();
        let update = StockUpdate::guarded(id, 5, 2);
        assert_eq!(update.expected, ExpectedQuantity::Exact(5));
        assert_eq!(update.quantity, 2);
    }

    #[test]
    fn serializes_with_tagged_expectation() {
        let update = StockUpdate::overwrite(ProductId::new(), 7);
        let json = serde_json::to_value(update).unwrap();
        assert_eq!(json["quantity"], 7);
        assert_eq!(json["expected"]["kind"], "any");
    }
}

use serde::{Deserialize, Serialize};

use orderflow_core::{DomainError, DomainResult, Entity, ProductId};

/// Entity: Product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    /// Price in smallest currency unit (e.g., cents).
    price: u64,
    /// Units currently available for ordering.
    quantity: u64,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: u64, quantity: u64) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id,
            name: name.trim().to_string(),
            price,
            quantity,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Whether `requested` units can be taken from current stock.
    ///
    /// Inclusive: asking for exactly the available quantity succeeds.
    pub fn can_fulfil(&self, requested: u64) -> bool {
        requested <= self.quantity
    }

    /// Copy of this product with a different stock level.
    pub fn with_quantity(&self, quantity: u64) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Copy of this product with a different price.
    pub fn with_price(&self, price: u64) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(quantity: u64) -> Product {
        Product::new(ProductId::new(), "Widget", 1_000, quantity).unwrap()
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Product::new(ProductId::new(), " ", 10, 1).unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn zero_priced_products_are_allowed() {
        let product = Product::new(ProductId::new(), "Sample", 0, 3).unwrap();
        assert_eq!(product.price(), 0);
    }

    #[test]
    fn can_fulfil_is_inclusive_at_the_boundary() {
        let product = widget(5);
        assert!(product.can_fulfil(4));
        assert!(product.can_fulfil(5));
        assert!(!product.can_fulfil(6));
    }

    #[test]
    fn out_of_stock_product_cannot_fulfil_anything_positive() {
        assert!(!widget(0).can_fulfil(1));
    }

    #[test]
    fn with_quantity_keeps_identity_and_price() {
        let product = widget(5);
        let restocked = product.with_quantity(9);

        assert_eq!(restocked.id_typed(), product.id_typed());
        assert_eq!(restocked.price(), product.price());
        assert_eq!(restocked.quantity(), 9);
        assert_eq!(product.quantity(), 5);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 1000,
                ..ProptestConfig::default()
            })]

            /// Property: can_fulfil agrees with `requested <= quantity` everywhere.
            #[test]
            fn can_fulfil_matches_inclusive_comparison(quantity in 0u64..10_000, requested in 0u64..10_000) {
                let product = widget(quantity);
                prop_assert_eq!(product.can_fulfil(requested), requested <= quantity);
            }
        }
    }
}

//! Value object trait: equality by value, not identity.
//!
//! Line items and stock updates carry no identity of their own; two with the
//! same attributes are interchangeable.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct LineItemRequest {
///     product_id: ProductId,
///     quantity: u64,
/// }
///
/// impl ValueObject for LineItemRequest {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

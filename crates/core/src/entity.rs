//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Customers, products and orders are all looked up and matched by identity,
/// never by attribute equality.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

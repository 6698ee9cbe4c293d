//! Customers domain module.
//!
//! A customer is an identity record; order creation only needs to know whether
//! one exists.

pub mod customer;

pub use customer::Customer;

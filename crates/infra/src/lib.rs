//! Infrastructure layer: repositories, configuration and the order-creation
//! workflow that composes them.

pub mod config;
pub mod order_workflow;
pub mod repository;


pub use config::WorkflowConfig;
pub use order_workflow::{OrderCreationWorkflow, WorkflowError};
pub use repository::{
    CustomerRepository, InMemoryCustomerRepository, InMemoryOrderRepository,
    InMemoryProductRepository, OrderRepository, ProductRepository, RepositoryError,
};

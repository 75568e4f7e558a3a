pub mod manager;
pub mod strategy;

pub use manager::{IndexManager, LifecycleState};
pub use strategy::{Engine, IndexedStrategy, Retriever, SubstringStrategy};

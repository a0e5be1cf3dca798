pub mod factory;
pub mod memory;
pub mod repository;

pub use factory::{StoreConfig, StoreFactory, StoreRegistry};
pub use memory::{InMemorySettingsStore, InMemoryStoreFactory};
pub use repository::{SettingsStore, SharedSettingsStore, StoreError, load_configuration};

pub mod actions;
pub mod codegen;
pub mod error;
pub mod persist;
pub mod refresh;
pub mod runner;
pub mod store;

pub use actions::UiEvent;
pub use error::StoreError;
pub use persist::{
    AppSnapshot, FileSnapshotStore, MemorySnapshotStore, STORAGE_KEY, SnapshotStore,
};
pub use refresh::RefreshScheduler;
pub use store::AppStore;

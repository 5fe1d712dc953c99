pub mod hook_store;
pub mod locking;
pub mod registry;
pub mod snapshot_store;
pub mod state_dir;
pub mod usage;

pub use hook_store::HookStore;
pub use registry::{Registry, SessionMap};
pub use state_dir::StateDir;

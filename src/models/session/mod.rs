mod methods;
mod transitions;
mod types;

pub use types::{HeartbeatPolicy, Session, WindowHandle};

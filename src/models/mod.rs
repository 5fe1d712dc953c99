pub mod constants;
pub mod hook;
pub mod metrics;
pub mod oversight;
pub mod session;
pub mod snapshot;
pub mod status;

pub use hook::{HookEvent, HookRecord};
pub use metrics::{TimeTotals, UsageTotals};
pub use oversight::{OversightPolicy, Report, ReportStatus};
pub use session::{HeartbeatPolicy, Session, WindowHandle};
pub use snapshot::{AggregateTotals, DaemonSnapshot, SessionSnapshot};
pub use status::{AgentStatus, Lifecycle, StatusSample};

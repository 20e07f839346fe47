// esc-core: selection, caching and control logic between esc-api and the CLI.

pub mod cache;
pub mod control;
pub mod error;
pub mod filter;
pub mod source;
pub mod view;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{ResultCache, slot};
pub use control::{
    ControlAction, ControlChannel, ControlMode, ControlOutcome, RelayState, run_control,
};
pub use error::CoreError;
pub use filter::{FilterSpec, SortKey, apply, find_by_prefix};
pub use source::LineSource;
pub use view::{LineView, with_status};

// Wire records are the domain model; re-export them for consumers.
pub use esc_api::{Exchange, Line, LineGroup, LineStatus, NewLine};

// esc-api: Async client for the ESC lighting backend (REST + control channel)

pub mod client;
pub mod control;
pub mod error;
pub mod transport;
pub mod types;

pub use client::LightingClient;
pub use control::{
    ControlEndpoint, ControlRequest, ControlSession, CtlCommand, Exchange, ModeTarget, ObjectRef,
    SessionState,
};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{Line, LineGroup, LineStatus, NewLine};

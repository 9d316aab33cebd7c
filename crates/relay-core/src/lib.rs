//! `relay-core` — message composition, completion detection, and broadcast
//! polling for terminal agent endpoints.
//!
//! The engine sends a text message to one or more tmux panes and detects
//! when each pane has finished replying: the endpoint is instructed to
//! print a nonce-scoped marker, and completion fires only once the marker
//! is visible, a minimum wait has elapsed, and the output has stopped
//! changing for an idle window. Timeouts capture a best-effort partial
//! response; a cancellation token stops everything and releases the
//! advisory active-request registry.

pub mod broadcast;
pub mod cancel;
pub mod clock;
pub mod compose;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod extract;
pub mod io;
pub mod paths;
pub mod protocol;
pub mod registry;
pub mod settle;
pub mod terminal;
pub mod wait;

pub use cancel::CancelToken;
pub use clock::{Clock, SystemClock};
pub use config::RelayConfig;
pub use endpoint::Endpoint;
pub use error::{RelayError, Result};
pub use terminal::{Terminal, TmuxTerminal};

//! Transport implementations.
//!
//! Each implements the [`Transport`](crate::Transport) trait. A transport that
//! talks to the Mandrill HTTP API is supplied by the application, using
//! [`Delivery::api_payload`](crate::Delivery::api_payload).
//!
//! | Transport | Feature Flag | Description |
//! |-----------|-------------|-------------|
//! | [`LocalTransport`] | `local` | In-memory capture for dev/testing |
//! | [`LoggerTransport`] | (none) | Logs deliveries without sending |

#[cfg(feature = "local")]
mod local;
#[cfg(feature = "local")]
pub use local::LocalTransport;

mod logger;
pub use logger::LoggerTransport;

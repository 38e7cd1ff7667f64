//! `meshbridge`: relays civil-defense alerts and breaking news to a mesh
//! radio network.
//!
//! Two poll cycles run side by side. The alert cycle fetches a live alert
//! feed, tracks the alert phase and emits a notification on every phase
//! change or new aircraft incursion. The news cycle fetches an RSS/Atom
//! feed and relays each unseen headline once. Both hand their messages to
//! a single [`transport::Dispatcher`], which splits them into size-limited
//! fragments and sends them one at a time.

pub mod alert;
pub mod bridge;
pub mod chunk;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod message;
pub mod news;
pub mod observability;
pub mod transport;

pub use bridge::{Bridge, BridgeSettings};
pub use config::BridgeConfig;
pub use error::{BridgeError, ExitCode};

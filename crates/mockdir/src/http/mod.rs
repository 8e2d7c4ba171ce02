//! HTTP hosting layer: turns hyper requests into dispatcher calls.
//!
//! # Module Structure
//!
//! - `builder` - Hyper response assembly from status, header lines and body
//! - `server` - Accept loops for the mock listener and the metrics listener

mod builder;
mod server;

pub use builder::ReplyBuilder;
pub use server::{serve_metrics, MockServer};

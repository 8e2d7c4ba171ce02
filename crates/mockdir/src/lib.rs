//! File-backed state and resolution engine for an HTTP test double.
//!
//! Every request is handled against a shared state directory: the request is
//! counted and journaled, its path is resolved through registered patterns
//! and aliases to a stored response, and sequenced responses are advanced and
//! written back. Nothing is shared between requests except that directory.

// ===== State directory =====
pub mod error;
pub mod store;

// ===== Requests and responses =====
pub mod request;
pub mod response;

// ===== Dispatch and registration =====
pub mod dispatcher;
pub mod inspect;
pub mod registrar;

// ===== Hosting =====
pub mod config;
pub mod http;
pub mod metrics;

pub use dispatcher::{Dispatcher, Outcome, Reply};
pub use error::{Result, StoreError};
pub use registrar::Registrar;
pub use request::RequestRecord;
pub use response::{
    DelayedResponse, HeaderEntry, MockResponse, NotFoundResponse, Response, SequenceResponse,
    Sequenced, StaticResponse,
};
pub use store::StateDir;

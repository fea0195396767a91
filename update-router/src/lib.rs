//! # Update router
//!
//! Maps update kinds to handler routes. A handler type registers its routes once through
//! [`UpdateHandler::register`]; the resulting [`HandlerRegistry`] is shared by every [`Dispatcher`]
//! for that type. Routing is identical for polled and webhook-delivered updates.

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{
    report_handler_error, Dispatcher, RouteOutcome, UpdateRouter, DEFAULT_TRANSPORT_BACKOFF,
};
pub use registry::{HandlerFuture, HandlerRegistry, RegistryBuilder, UpdateHandler};

// Integration tests live in tests/dispatcher_test.rs

//! PAwR responder library.
//!
//! Exposes the lifecycle service, payload encoder and port traits for
//! integration testing.  Host simulation adapters live in [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod advertising;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;

pub use error::{Error, Result};

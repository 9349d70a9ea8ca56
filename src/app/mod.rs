//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the responder's rules: lifecycle sequencing,
//! advertising payload construction and subevent responses.  All interaction
//! with the radio stack happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without a radio.

pub mod events;
pub mod ports;
pub mod service;

//! RISE EDR Service Library
//!
//! Wires configuration, a [`source::LocationSource`] and the
//! `rise-locations` engine into the commands exposed by the `rise-edr`
//! binary.

pub mod commands;
pub mod config;
pub mod source;

//! Core of readkeeper: stores, the control/data command protocol, and the
//! presence-gated read-acknowledgment policy.
//!
//! This crate is framework-agnostic. The Telegram bot UI and the user-account
//! client live in adapter crates behind `messaging::port::MessagingClient`.

pub mod chats;
pub mod config;
pub mod control;
pub mod data_actor;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod protocol;
pub mod security;
pub mod store;

#[cfg(test)]
mod fakes;

pub use errors::{Error, Result};

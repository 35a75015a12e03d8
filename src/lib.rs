//! Client-side session glue for a token faucet.
//!
//! SYSTEM CONTEXT
//! ==============
//! The faucet backend hands out test tokens at most once per day per GitHub
//! account. This crate is the client half: it logs the user in through an
//! OAuth provider, asks the backend when that account last claimed, runs the
//! cooldown countdown, and submits claims. Everything observable lives in
//! `state::Store`, a set of subscribable cells.

pub mod api;
pub mod app;
pub mod auth;
pub mod claim;
pub mod clock;
pub mod config;
pub mod notify;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_helpers;

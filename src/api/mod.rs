//! API Module
//!
//! This module handles the HTTP API respondents use to fill and submit the form.

mod server;

#[cfg(test)]
mod tests;

pub use server::{AppState, Server};

//! Spreadsheet web-app client for the surgenda remote store.
//!
//! Implements [`surgenda_core::RemoteStore`] against the deployed sheet
//! web app: day/month/catalog reads are GET requests with query parameters,
//! mutations are POSTed JSON action payloads, and token verification checks
//! the membership map the backend serves.

pub mod client;
pub mod wire;

pub use client::*;
pub use wire::*;

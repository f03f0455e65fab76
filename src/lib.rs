//! Coursegate - course catalog and content-unlock backend for a chat-bot school
//!
//! The library holds the catalog, the unlock engine and the HTTP API that the
//! bot talks to.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

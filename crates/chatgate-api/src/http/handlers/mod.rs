//! HTTP request handlers.

pub mod catalog;
pub mod chat;

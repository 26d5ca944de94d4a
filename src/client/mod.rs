//! HTTP clients for remote store APIs.

pub mod http;

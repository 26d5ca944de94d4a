//! Optional runtime integrations.

pub mod tokio;

pub mod config;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod styles;

#[cfg(test)]
mod testing;

pub use config::AutocutConfig;
pub use service::{AutocutService, SubmitRequest};

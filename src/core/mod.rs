pub mod alerts;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod devices;
pub mod error;
pub mod labels;
pub mod merger;
pub mod model;
pub mod trace;
pub mod zone;

#[cfg(test)]
pub(crate) mod testing;

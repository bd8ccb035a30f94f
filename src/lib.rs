#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
pub mod core;

pub mod app;
pub mod console;
pub use app::{FeedbackHandle, FeedbackService};

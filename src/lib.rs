pub mod alert;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod instrument;
pub mod monitor;
pub mod notify;
pub mod utils;

pub use error::{AppError, Result};

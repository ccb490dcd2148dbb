pub mod config;
pub mod error;
pub mod format;
pub mod gateway;
pub mod model;
pub mod retry;
pub mod session;
pub mod storage;
pub mod tasks;

pub use error::{Result, SmartTaskError};

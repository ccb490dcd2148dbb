pub mod ai;
pub mod auth;
pub mod notification;
pub mod settings;
pub mod task;
pub mod timestamp;

pub use ai::*;
pub use auth::*;
pub use notification::*;
pub use settings::*;
pub use task::*;

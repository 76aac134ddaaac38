pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod frontend;
pub mod health;
pub mod model;
pub mod telemetry;

pub use api::{build_router, AppState};
pub use config::Config;
pub use controller::{ControllerError, TextController};
pub use error::{ServiceError, ServiceResult};

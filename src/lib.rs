pub mod app;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;
pub mod users;
pub mod workouts;

pub use app::router;
pub use config::Config;
pub use errors::{AppError, StoreError};
pub use state::AppState;
pub use users::UserStore;
pub use workouts::WorkoutStore;

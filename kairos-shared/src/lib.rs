pub mod models;
pub mod window;

pub use window::{add_minutes, TimeWindow, WindowError};

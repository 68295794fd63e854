pub mod manager;
pub mod policy;
pub mod token;

pub use manager::{CreateHold, HoldTokenManager};
pub use policy::HoldPolicy;

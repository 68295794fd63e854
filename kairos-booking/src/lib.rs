pub mod committer;

pub use committer::{BookingCommitter, CommitBooking};

pub mod calculator;

pub use calculator::{candidate_windows, AvailabilityCalculator, SlotQuery};

use std::sync::Arc;

use kairos_availability::AvailabilityCalculator;
use kairos_booking::BookingCommitter;
use kairos_core::repository::HoldStore;
use kairos_hold::HoldTokenManager;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub availability: Arc<AvailabilityCalculator>,
    pub holds: Arc<HoldTokenManager>,
    pub committer: Arc<BookingCommitter>,
    pub hold_store: Arc<dyn HoldStore>,
    pub metrics: Metrics,
}

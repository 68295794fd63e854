use std::time::Duration;

/// Lifecycle rules for holds. Tenancy-independent; loaded once from config
/// and shared by the manager and the sweeper.
#[derive(Debug, Clone)]
pub struct HoldPolicy {
    /// Initial TTL granted at creation.
    pub ttl: Duration,
    /// Per-call bounds for `extend`, in minutes.
    pub extend_min_minutes: u32,
    pub extend_max_minutes: u32,
    /// Hard ceiling: no extension may push the expiry past
    /// `created_at + max_lifetime_minutes`.
    pub max_lifetime_minutes: u32,
}

impl Default for HoldPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            extend_min_minutes: 1,
            extend_max_minutes: 30,
            max_lifetime_minutes: 30,
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable service menu. Owned by the menu-management collaborator;
/// this core only reads it to derive slot durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub prep_minutes: u32,
    pub service_minutes: u32,
    pub cleanup_minutes: u32,
    pub is_active: bool,
}

impl Menu {
    /// Full slot length a booking of this menu occupies.
    pub fn total_minutes(&self) -> u32 {
        self.prep_minutes + self.service_minutes + self.cleanup_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_includes_prep_and_cleanup() {
        let menu = Menu {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Cut & Color".to_string(),
            prep_minutes: 10,
            service_minutes: 60,
            cleanup_minutes: 20,
            is_active: true,
        };
        assert_eq!(menu.total_minutes(), 90);
    }
}

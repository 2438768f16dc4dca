use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::DatabaseConfig;

/// Result of diffing the scheduler's installed-job snapshot against a
/// fresh read of active configs from the store.
pub struct ConfigDiff {
    pub added: Vec<DatabaseConfig>,
    pub removed: Vec<Uuid>,
    /// Present in both, but the cron expression changed. A
    /// `tokio_cron_scheduler` job's schedule can't be edited in place, so
    /// these get removed and re-added.
    pub rescheduled: Vec<DatabaseConfig>,
}

pub fn diff_configs(previous: &HashMap<Uuid, String>, current: &[DatabaseConfig]) -> ConfigDiff {
    let mut added = Vec::new();
    let mut rescheduled = Vec::new();
    let mut seen = HashSet::new();

    for config in current {
        seen.insert(config.id);
        match previous.get(&config.id) {
            None => added.push(config.clone()),
            Some(prev_schedule) if prev_schedule != &config.cron_schedule => rescheduled.push(config.clone()),
            Some(_) => {}
        }
    }

    let removed = previous.keys().filter(|id| !seen.contains(id)).copied().collect();

    ConfigDiff { added, removed, rescheduled }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetentionPolicy;
    use chrono::Utc;

    fn config(id: Uuid, cron: &str) -> DatabaseConfig {
        DatabaseConfig {
            id,
            name: "db".into(),
            host: "localhost".into(),
            port: 5432,
            database_name: "db".into(),
            username: "u".into(),
            password: "p".into(),
            cron_schedule: cron.into(),
            storage_config_id: Uuid::new_v4(),
            notification_config_id: None,
            retention: RetentionPolicy::Count { value: 5 },
            version_label: "16".into(),
            enabled: true,
            paused: false,
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn detects_added_and_removed() {
        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let id_c = Uuid::new_v4();

        let mut previous = HashMap::new();
        previous.insert(id_a, "0 0 * * *".to_string());
        previous.insert(id_b, "0 0 * * *".to_string());

        let current = vec![config(id_a, "0 0 * * *"), config(id_c, "0 12 * * *")];

        let diff = diff_configs(&previous, &current);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].id, id_c);
        assert_eq!(diff.removed, vec![id_b]);
        assert!(diff.rescheduled.is_empty());
    }

    #[test]
    fn detects_schedule_change() {
        let id = Uuid::new_v4();
        let mut previous = HashMap::new();
        previous.insert(id, "0 0 * * *".to_string());

        let current = vec![config(id, "0 6 * * *")];

        let diff = diff_configs(&previous, &current);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(diff.rescheduled.len(), 1);
    }

    #[test]
    fn unchanged_config_produces_empty_diff() {
        let id = Uuid::new_v4();
        let mut previous = HashMap::new();
        previous.insert(id, "0 0 * * *".to_string());

        let current = vec![config(id, "0 0 * * *")];

        let diff = diff_configs(&previous, &current);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert!(diff.rescheduled.is_empty());
    }
}

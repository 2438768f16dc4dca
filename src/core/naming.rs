use chrono::Utc;
use rand::seq::SliceRandom;
use uuid::Uuid;

const ADJECTIVES: &[&str] = &[
    "amber", "brisk", "calm", "dusty", "eager", "fleet", "gentle", "hollow", "ionic", "jolly",
    "keen", "lively", "mellow", "nimble", "opal", "plain", "quiet", "rapid", "steady", "tidy",
];

const NOUNS: &[&str] = &[
    "badger", "canyon", "delta", "ember", "falcon", "glacier", "harbor", "inlet", "juniper",
    "kestrel", "lagoon", "meadow", "nebula", "orchid", "prairie", "quartz", "ridge", "summit",
    "thicket", "willow",
];

/// Cosmetic human-readable backup name: `<adjective>-<noun>-<YYYYMMDD>`. The
/// actual collision guarantee comes from the backup's own UUID, not from
/// this string -- two backups for the same config on the same day will
/// legitimately share an adjective-noun-date triple.
pub fn generate_backup_name(backup_id: Uuid) -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).expect("ADJECTIVES is non-empty");
    let noun = NOUNS.choose(&mut rng).expect("NOUNS is non-empty");
    let date = Utc::now().format("%Y%m%d");
    format!("{adjective}-{noun}-{date}")
}

/// Storage key layout: `backups/<db-name>/<artifact-filename>`. Includes
/// the backup's UUID so retries or same-day backups for one config never
/// collide even though `generate_backup_name` can repeat.
pub fn storage_key(db_name: &str, backup_name: &str, backup_id: Uuid) -> String {
    format!("backups/{db_name}/{backup_name}-{backup_id}.dump.gz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_backup_name_has_three_dash_separated_parts() {
        let name = generate_backup_name(Uuid::new_v4());
        let parts: Vec<&str> = name.split('-').collect();
        assert_eq!(parts.len(), 3, "expected adjective-noun-date: {name}");
        assert_eq!(parts[2].len(), 8, "date part should be YYYYMMDD: {name}");
    }

    #[test]
    fn storage_key_embeds_db_name_and_backup_id() {
        let id = Uuid::new_v4();
        let key = storage_key("prod", "amber-falcon-20260101", id);
        assert!(key.starts_with("backups/prod/"));
        assert!(key.contains(&id.to_string()));
        assert!(key.ends_with(".dump.gz"));
    }

    #[test]
    fn storage_key_is_unique_per_backup_even_with_same_name() {
        let a = storage_key("prod", "amber-falcon-20260101", Uuid::new_v4());
        let b = storage_key("prod", "amber-falcon-20260101", Uuid::new_v4());
        assert_ne!(a, b, "two attempts sharing a cosmetic name must not collide");
    }
}

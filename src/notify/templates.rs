use std::time::Duration;

/// A fully rendered webhook payload body. Kept as plain text/JSON rather
/// than a rich embed format -- the webhook surface here is generic, not
/// tied to a specific chat platform's block kit.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Message {
    pub content: String,
}

impl Message {
    pub fn backup_success(db_name: &str, size_bytes: i64, duration: Duration) -> Self {
        Self {
            content: format!(
                "✅ Backup Succeeded\ndatabase: {db_name}\nsize: {}\nduration: {}s",
                format_bytes(size_bytes),
                duration.as_secs(),
            ),
        }
    }

    pub fn backup_failure(db_name: &str, error_tail: &str) -> Self {
        Self {
            content: format!("❌ Backup Failed\ndatabase: {db_name}\nerror: {}", truncate(error_tail, 500)),
        }
    }

    pub fn restore_success(db_name: &str) -> Self {
        Self { content: format!("✅ Restore Succeeded\ndatabase: {db_name}") }
    }

    pub fn restore_failure(db_name: &str, error_tail: &str) -> Self {
        Self {
            content: format!("❌ Restore Failed\ndatabase: {db_name}\nerror: {}", truncate(error_tail, 500)),
        }
    }

    pub fn lifecycle(event: &str) -> Self {
        Self { content: format!("⚠️ {event}") }
    }

    pub fn otp(code: &str, expires_in: Duration) -> Self {
        Self {
            content: format!("🔑 One-time code: {code} (expires in {}m)", expires_in.as_secs() / 60),
        }
    }
}

/// Truncates to at most `max` **characters**, not bytes -- subprocess
/// stderr can be non-ASCII, and slicing on a raw byte index panics if it
/// lands mid-character.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}…", &s[..byte_idx]),
        None => s.to_string(),
    }
}

/// Binary byte units (KB = 1024).
fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_stays_in_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn truncate_adds_ellipsis_only_when_needed() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long message", 5), "a ver…");
    }

    #[test]
    fn truncate_does_not_split_a_multibyte_character() {
        let s = "erreur: base de données déjà utilisée";
        let truncated = truncate(s, 10);
        assert_eq!(truncated.chars().count(), 11);
        assert!(truncated.is_char_boundary(truncated.len()));
    }
}

use std::sync::OnceLock;

static CONSUMER_ID: OnceLock<String> = OnceLock::new();

/// Stable identifier of this consumer process, used in log lines.
///
/// `<hostname>:<pid>` when the hostname is readable, a random UUID otherwise.
pub fn consumer_id() -> &'static str {
    CONSUMER_ID.get_or_init(|| {
        let pid = std::process::id();
        if let Ok(hostname) = hostname::get()
            && let Some(name) = hostname.to_str()
            && !name.is_empty()
        {
            return format!("{name}:{pid}");
        }
        uuid::Uuid::new_v4().to_string()
    })
}

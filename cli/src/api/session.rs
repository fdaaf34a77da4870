use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

/// Millisecond timestamp followed by a random 4-digit suffix.
///
/// Two widgets opened in the same millisecond have a 1 in 9000 chance of
/// colliding; nothing here prevents that.
pub fn generate_chat_id(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("{}{}", now.timestamp_millis(), suffix)
}

pub(crate) fn creation_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

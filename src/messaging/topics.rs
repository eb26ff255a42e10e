//! Topic name normalisation.
//!
//! Topic names may be given with or without the `/topics/` prefix; the
//! prefix is stripped before the provider sees them.

use crate::messaging::constants::{MAX_TOPIC_NAME_LEN, TOPIC_PREFIX};
use crate::messaging::error::{invalid_argument, MessagingResult};

pub fn normalize_topic(name: &str) -> MessagingResult<String> {
    let trimmed = name.trim();
    let topic = trimmed.strip_prefix(TOPIC_PREFIX).unwrap_or(trimmed);

    if topic.is_empty() {
        return Err(invalid_argument("Topic name must not be empty"));
    }
    if topic.len() > MAX_TOPIC_NAME_LEN {
        return Err(invalid_argument(format!(
            "Topic name exceeds {MAX_TOPIC_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = topic.chars().find(|c| !is_topic_char(*c)) {
        return Err(invalid_argument(format!(
            "Invalid character '{bad}' in topic name '{topic}'"
        )));
    }
    Ok(topic.to_owned())
}

fn is_topic_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_whitespace() {
        assert_eq!(normalize_topic("/topics/news").unwrap(), "news");
        assert_eq!(normalize_topic("  weather.eu  ").unwrap(), "weather.eu");
    }

    #[test]
    fn rejects_bad_names() {
        assert!(normalize_topic("").is_err());
        assert!(normalize_topic("/topics/").is_err());
        assert!(normalize_topic("with space").is_err());
        assert!(normalize_topic(&"a".repeat(MAX_TOPIC_NAME_LEN + 1)).is_err());
        assert!(normalize_topic(&"a".repeat(MAX_TOPIC_NAME_LEN)).is_ok());
    }
}

//! Topic names and subscription filters

use crate::connectivity::{TransportError, TransportResult};
use crate::core::MAX_TOPIC_LENGTH;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated topic name or subscription filter.
///
/// Only the wire-format limits are enforced: non-empty, at most
/// [`MAX_TOPIC_LENGTH`] bytes, no NUL character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: impl Into<String>) -> TransportResult<Self> {
        let topic = topic.into();

        if topic.is_empty() {
            return Err(TransportError::InvalidTopic {
                reason: "topic is empty".to_string(),
            });
        }

        if topic.len() > MAX_TOPIC_LENGTH {
            return Err(TransportError::InvalidTopic {
                reason: format!("{} bytes exceeds limit of {}", topic.len(), MAX_TOPIC_LENGTH),
            });
        }

        if topic.contains('\0') {
            return Err(TransportError::InvalidTopic {
                reason: "topic contains NUL".to_string(),
            });
        }

        Ok(Self(topic))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a wildcard filter rather than a concrete name
    pub fn is_filter(&self) -> bool {
        self.0.split('/').any(|level| level == "+" || level == "#")
    }

    /// Whether `topic` is selected by this filter (`+` one level, `#` the rest)
    pub fn matches(&self, topic: &str) -> bool {
        let mut filter_levels = self.0.split('/');
        let mut topic_levels = topic.split('/');

        loop {
            match (filter_levels.next(), topic_levels.next()) {
                (Some("#"), _) => return true,
                (Some("+"), Some(_)) => continue,
                (Some(f), Some(t)) if f == t => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Topic {
    type Error = TransportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Topic::new(value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(Topic::new("mqtt-gps/dev1/status").is_ok());
        assert!(Topic::new("").is_err());
        assert!(Topic::new("a\0b").is_err());
        assert!(Topic::new("x".repeat(MAX_TOPIC_LENGTH)).is_ok());
        assert!(Topic::new("x".repeat(MAX_TOPIC_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_exact_match() {
        let topic = Topic::new("mqtt-gps/dev1/geofence/set").unwrap();
        assert!(!topic.is_filter());
        assert!(topic.matches("mqtt-gps/dev1/geofence/set"));
        assert!(!topic.matches("mqtt-gps/dev1/geofence"));
        assert!(!topic.matches("mqtt-gps/dev1/geofence/set/extra"));
    }

    #[test]
    fn test_wildcards() {
        let single = Topic::new("mqtt-gps/+/geofence/set").unwrap();
        assert!(single.is_filter());
        assert!(single.matches("mqtt-gps/dev1/geofence/set"));
        assert!(!single.matches("mqtt-gps/a/b/geofence/set"));

        let multi = Topic::new("mqtt-gps/#").unwrap();
        assert!(multi.matches("mqtt-gps"));
        assert!(multi.matches("mqtt-gps/dev1/status"));
        assert!(!multi.matches("other/dev1"));
    }

    #[test]
    fn test_serde_validates() {
        let topic: Topic = serde_json::from_str("\"a/b\"").unwrap();
        assert_eq!(topic.as_str(), "a/b");
        assert!(serde_json::from_str::<Topic>("\"\"").is_err());
    }
}

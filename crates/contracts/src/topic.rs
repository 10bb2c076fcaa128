//! MQTT topic filters

/// MQTT topic filter match (`+` single level, `#` trailing multi level)
///
/// Wildcard characters in `topic` are compared literally, so a filter
/// covers another filter when it would cover every level of it.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

//! Event classification policy.
//!
//! A `PolicyTable` decides which (kind, action) pairs are worth notifying
//! about. The table is built once at startup and read-only afterwards.
//! Anything not explicitly listed is dropped: new or unexpected daemon
//! actions never reach a channel until they are allow-listed.

use crate::core::Event;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Read-only allow-table mapping an event kind to its notifiable actions.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyTable {
    allowed: HashMap<String, HashSet<String>>,
}

impl Default for PolicyTable {
    /// The stock policy: container lifecycle transitions plus synthetic
    /// connection messages from the event source.
    fn default() -> Self {
        let mut allowed = HashMap::new();
        allowed.insert(
            "container".to_string(),
            [
                "start",
                "die",
                "health_status: healthy",
                "health_status: unhealthy",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        allowed.insert(
            "connection".to_string(),
            ["message"].iter().map(|s| s.to_string()).collect(),
        );
        Self { allowed }
    }
}

impl PolicyTable {
    /// Builds a table from configuration overrides. An empty map keeps the
    /// stock policy; a non-empty map replaces it wholesale.
    pub fn from_overrides(overrides: &HashMap<String, Vec<String>>) -> Self {
        if overrides.is_empty() {
            return Self::default();
        }
        let allowed = overrides
            .iter()
            .map(|(kind, actions)| {
                (
                    kind.clone(),
                    actions.iter().cloned().collect::<HashSet<String>>(),
                )
            })
            .collect();
        Self { allowed }
    }

    /// Returns true when the event's (kind, action) pair is allow-listed.
    ///
    /// Fail-closed: an unknown kind or an unknown action under a known kind
    /// both return false. Pure apart from a debug-level log on rejection.
    pub fn should_notify(&self, event: &Event) -> bool {
        let supported = self
            .allowed
            .get(&event.kind)
            .map(|actions| actions.contains(&event.action))
            .unwrap_or(false);

        if !supported {
            debug!(
                kind = %event.kind,
                action = %event.action,
                "skipping event not covered by notification policy"
            );
        }
        supported
    }

    /// Number of (kind, action) pairs in the table. Logged at startup.
    pub fn len(&self) -> usize {
        self.allowed.values().map(HashSet::len).sum()
    }

    /// True when no pair is allow-listed (a valid, if silent, configuration).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, action: &str) -> Event {
        Event::new(kind, action)
    }

    #[test]
    fn stock_policy_allows_listed_container_actions() {
        let policy = PolicyTable::default();
        assert!(policy.should_notify(&event("container", "start")));
        assert!(policy.should_notify(&event("container", "die")));
        assert!(policy.should_notify(&event("container", "health_status: healthy")));
        assert!(policy.should_notify(&event("container", "health_status: unhealthy")));
        assert!(policy.should_notify(&event("connection", "message")));
    }

    #[test]
    fn unknown_action_under_known_kind_is_dropped() {
        let policy = PolicyTable::default();
        assert!(!policy.should_notify(&event("container", "create")));
        assert!(!policy.should_notify(&event("container", "exec_start")));
    }

    #[test]
    fn unknown_kind_is_dropped() {
        let policy = PolicyTable::default();
        assert!(!policy.should_notify(&event("network", "connect")));
        assert!(!policy.should_notify(&event("volume", "mount")));
    }

    #[test]
    fn overrides_replace_the_stock_table() {
        let mut overrides = HashMap::new();
        overrides.insert("network".to_string(), vec!["connect".to_string()]);
        let policy = PolicyTable::from_overrides(&overrides);

        assert!(policy.should_notify(&event("network", "connect")));
        // The stock entries are gone once an override table is supplied.
        assert!(!policy.should_notify(&event("container", "start")));
    }

    #[test]
    fn empty_overrides_keep_the_stock_table() {
        let policy = PolicyTable::from_overrides(&HashMap::new());
        assert_eq!(policy, PolicyTable::default());
        assert_eq!(policy.len(), 5);
    }
}

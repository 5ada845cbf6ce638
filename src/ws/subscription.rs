//! Per-connection subscription manager.
//!
//! Tracks the STOMP subscriptions of one WebSocket client and provides
//! server-side filtering of broker messages. Subscription destinations may
//! be patterns: `*` matches one path segment, `**` any number of segments.

use std::collections::HashMap;

use crate::error::GatewayError;

/// Manages the subscriptions of a single STOMP session.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscription id → destination pattern.
    by_id: HashMap<String, String>,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicateSubscription`] if `id` is in use.
    pub fn subscribe(&mut self, id: &str, destination: &str) -> Result<(), GatewayError> {
        if self.by_id.contains_key(id) {
            return Err(GatewayError::DuplicateSubscription(id.to_owned()));
        }
        self.by_id.insert(id.to_owned(), destination.to_owned());
        Ok(())
    }

    /// Removes a subscription, returning its destination if it existed.
    pub fn unsubscribe(&mut self, id: &str) -> Option<String> {
        self.by_id.remove(id)
    }

    /// Returns the ids of all subscriptions matching `destination`, sorted.
    #[must_use]
    pub fn matching(&self, destination: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .by_id
            .iter()
            .filter(|(_, pattern)| destination_matches(pattern, destination))
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of active subscriptions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.by_id.len()
    }
}

/// Returns `true` if `destination` matches the subscription `pattern`.
///
/// Runs in `O(pattern segments × destination segments)`: on a mismatch the
/// scan resumes only from the most recent `**`, never from earlier ones.
#[must_use]
pub fn destination_matches(pattern: &str, destination: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('/').collect();
    let destination: Vec<&str> = destination.split('/').collect();

    let (mut p, mut d) = (0, 0);
    // (index of the last `**`, destination index it currently absorbs up to)
    let mut resume: Option<(usize, usize)> = None;

    while let Some(&actual) = destination.get(d) {
        match pattern.get(p) {
            Some(&"**") => {
                resume = Some((p, d));
                p += 1;
            }
            Some(&segment) if segment == "*" || segment == actual => {
                p += 1;
                d += 1;
            }
            _ => match resume {
                Some((star, absorbed)) => {
                    resume = Some((star, absorbed + 1));
                    p = star + 1;
                    d = absorbed + 1;
                }
                None => return false,
            },
        }
    }
    pattern
        .get(p..)
        .is_some_and(|rest| rest.iter().all(|segment| *segment == "**"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(mgr.matching("/topic/greetings").is_empty());
    }

    #[test]
    fn exact_subscription_matches_only_its_topic() {
        let mut mgr = SubscriptionManager::new();
        assert!(mgr.subscribe("sub-0", "/topic/greetings").is_ok());
        assert_eq!(mgr.matching("/topic/greetings"), vec!["sub-0"]);
        assert!(mgr.matching("/topic/other").is_empty());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut mgr = SubscriptionManager::new();
        assert!(mgr.subscribe("sub-0", "/topic/a").is_ok());
        assert!(matches!(
            mgr.subscribe("sub-0", "/topic/b"),
            Err(GatewayError::DuplicateSubscription(id)) if id == "sub-0"
        ));
    }

    #[test]
    fn several_subscriptions_to_one_topic_all_match() {
        let mut mgr = SubscriptionManager::new();
        assert!(mgr.subscribe("b", "/topic/greetings").is_ok());
        assert!(mgr.subscribe("a", "/topic/*").is_ok());
        assert_eq!(mgr.matching("/topic/greetings"), vec!["a", "b"]);
    }

    #[test]
    fn unsubscribe_removes_subscription() {
        let mut mgr = SubscriptionManager::new();
        assert!(mgr.subscribe("sub-0", "/topic/greetings").is_ok());
        assert_eq!(mgr.unsubscribe("sub-0").as_deref(), Some("/topic/greetings"));
        assert!(mgr.matching("/topic/greetings").is_empty());
        assert_eq!(mgr.count(), 0);
        assert!(mgr.unsubscribe("sub-0").is_none());
    }

    #[test]
    fn single_star_matches_one_segment() {
        assert!(destination_matches("/topic/*", "/topic/greetings"));
        assert!(!destination_matches("/topic/*", "/topic/a/b"));
        assert!(!destination_matches("/topic/*", "/queue/greetings"));
    }

    #[test]
    fn double_star_matches_any_depth() {
        assert!(destination_matches("/topic/**", "/topic"));
        assert!(destination_matches("/topic/**", "/topic/a/b/c"));
        assert!(destination_matches("/**/greetings", "/topic/x/greetings"));
        assert!(!destination_matches("/topic/**", "/queue/a"));
    }

    #[test]
    fn double_star_may_match_nothing() {
        assert!(destination_matches("/topic/**/greetings", "/topic/greetings"));
        assert!(destination_matches("/topic/**/**/greetings", "/topic/greetings"));
        assert!(destination_matches("/**", "/topic/greetings"));
        assert!(!destination_matches("/topic/**/greetings", "/topic/greetings/x"));
    }

    #[test]
    fn double_star_backtracks_to_later_segments() {
        assert!(destination_matches("/topic/**/a/*", "/topic/a/a/b"));
        assert!(destination_matches("/**/a/**/b", "/topic/a/x/a/y/b"));
        assert!(!destination_matches("/**/a/**/b", "/topic/a/x/y"));
    }

    #[test]
    fn many_double_stars_against_deep_destination_stay_fast() {
        let destination = format!("/topic{}", "/a".repeat(30));
        let started = std::time::Instant::now();
        for stars in [8, 12, 40] {
            let pattern = format!("{}/z", "/**".repeat(stars));
            assert!(!destination_matches(&pattern, &destination));
        }
        let pattern = format!("{}/a", "/**".repeat(40));
        assert!(destination_matches(&pattern, &destination));
        assert!(
            started.elapsed() < std::time::Duration::from_secs(1),
            "matching took {:?}",
            started.elapsed()
        );
    }
}

// 🏠 Destination Classifier
// Labels a record home-bound or accompanying from its route text.
//
// Two ordered checks, first match wins:
//   1. structured parse: keyword is inside the parsed exit station
//   2. substring fallback: keyword appears after the first exit marker
// Empty keyword → everything is accompanying.

use crate::route::{parse_route, EXIT_MARKER};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    Home,
    Accompanying,
}

/// Ledger labels for each destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationLabels {
    pub home: String,
    pub accompanying: String,
}

impl Default for DestinationLabels {
    fn default() -> Self {
        DestinationLabels {
            home: "自宅".to_string(),
            accompanying: "同行".to_string(),
        }
    }
}

impl DestinationLabels {
    pub fn label(&self, destination: Destination) -> &str {
        match destination {
            Destination::Home => &self.home,
            Destination::Accompanying => &self.accompanying,
        }
    }
}

pub struct DestinationClassifier {
    home_keyword: String,
}

impl DestinationClassifier {
    pub fn new(home_keyword: impl Into<String>) -> Self {
        DestinationClassifier {
            home_keyword: home_keyword.into(),
        }
    }

    pub fn home_keyword(&self) -> &str {
        &self.home_keyword
    }

    pub fn classify(&self, route: &str) -> Destination {
        if self.home_keyword.is_empty() {
            return Destination::Accompanying;
        }

        if self.exit_station_matches(route) || self.text_after_exit_matches(route) {
            Destination::Home
        } else {
            Destination::Accompanying
        }
    }

    /// Check 1: keyword is a substring of the parsed exit station
    fn exit_station_matches(&self, route: &str) -> bool {
        parse_route(route)
            .exit
            .is_some_and(|exit| exit.contains(&self.home_keyword))
    }

    /// Check 2: keyword anywhere after the first exit marker (marker included).
    /// Loose: also matches text outside a station name.
    fn text_after_exit_matches(&self, route: &str) -> bool {
        route
            .find(EXIT_MARKER)
            .is_some_and(|idx| route[idx..].contains(&self.home_keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_station_contains_keyword_is_home() {
        let classifier = DestinationClassifier::new("B駅");
        assert_eq!(
            classifier.classify("入A駅(山手線)出B駅(山手線)"),
            Destination::Home
        );
    }

    #[test]
    fn test_other_exit_station_is_accompanying() {
        let classifier = DestinationClassifier::new("B駅");
        assert_eq!(
            classifier.classify("入A駅(山手線)出C駅(山手線)"),
            Destination::Accompanying
        );
    }

    #[test]
    fn test_keyword_only_in_entry_is_accompanying() {
        let classifier = DestinationClassifier::new("A駅");
        assert_eq!(
            classifier.classify("入A駅(山手線)出C駅(山手線)"),
            Destination::Accompanying
        );
    }

    #[test]
    fn test_fallback_matches_unparsed_text_after_exit_marker() {
        let classifier = DestinationClassifier::new("荻窪");
        // no line names → structured parse misses, fallback still sees "出荻窪"
        assert_eq!(classifier.classify("入新宿 出荻窪"), Destination::Home);
        assert_eq!(classifier.classify("荻窪 入新宿"), Destination::Accompanying);
    }

    #[test]
    fn test_fallback_matches_keyword_outside_station_name() {
        // heuristic is loose: keyword inside the exit line name still counts
        let classifier = DestinationClassifier::new("中央");
        assert_eq!(
            classifier.classify("入A駅(山手線)出B駅(中央線)"),
            Destination::Home
        );
    }

    #[test]
    fn test_empty_keyword_is_always_accompanying() {
        let classifier = DestinationClassifier::new("");
        assert_eq!(
            classifier.classify("入A駅(山手線)出B駅(山手線)"),
            Destination::Accompanying
        );
    }

    #[test]
    fn test_labels() {
        let labels = DestinationLabels::default();
        assert_eq!(labels.label(Destination::Home), "自宅");
        assert_eq!(labels.label(Destination::Accompanying), "同行");
    }
}

// 🚉 Route Parser
// Pulls the entry/exit station pair out of a transit route description:
//   "入A駅(山手線)出B駅(山手線)"  →  (A駅, B駅)
// A miss is normal: bus fares, top-ups and free text don't describe a hop.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Character marking the exit half of a route description
pub const EXIT_MARKER: char = '出';

// enter <station> (<line>) exit <station> (<line>), anchored to the end
static ENTER_EXIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"入\s*(?P<entry>.+?)\s*\(.+?\)\s*出\s*(?P<exit>.+?)\s*\(.+?\)\s*$")
        .expect("valid regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationPair {
    pub entry: Option<String>,
    pub exit: Option<String>,
}

impl StationPair {
    pub fn unknown() -> Self {
        StationPair::default()
    }

    pub fn is_known(&self) -> bool {
        self.entry.is_some() || self.exit.is_some()
    }
}

/// Parse a route description. Never fails; a non-matching string yields
/// `StationPair::unknown()`.
pub fn parse_route(route: &str) -> StationPair {
    let Some(caps) = ENTER_EXIT.captures(route.trim()) else {
        return StationPair::unknown();
    };

    StationPair {
        entry: caps.name("entry").map(|m| m.as_str().trim().to_string()),
        exit: caps.name("exit").map(|m| m.as_str().trim().to_string()),
    }
}

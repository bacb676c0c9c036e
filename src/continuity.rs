// 🔗 Continuity Flagger
//
// Linear state machine over the write order:
//   state      = exit station carried from the previous row (or none)
//   transition = parse next route; break iff carried exit and new entry
//                are both known and differ; known exit replaces state
// Unparsed routes neither confirm nor break the chain and never reset it.

use crate::route::{parse_route, StationPair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Carried exit equals the new entry
    Continuous,

    /// Carried exit and new entry are known and differ
    Break { carried_exit: String, entry: String },

    /// Either side unknown: no judgement
    Unknown,
}

impl Verdict {
    pub fn is_break(&self) -> bool {
        matches!(self, Verdict::Break { .. })
    }
}

/// Pure transition: (state, stations) → (next state, verdict)
pub fn step(carried_exit: Option<String>, stations: StationPair) -> (Option<String>, Verdict) {
    let verdict = match (&carried_exit, &stations.entry) {
        (Some(exit), Some(entry)) if exit == entry => Verdict::Continuous,
        (Some(exit), Some(entry)) => Verdict::Break {
            carried_exit: exit.clone(),
            entry: entry.clone(),
        },
        _ => Verdict::Unknown,
    };

    let next = stations.exit.or(carried_exit);
    (next, verdict)
}

/// Accumulator threaded through the append loop
#[derive(Debug, Clone, Default)]
pub struct ContinuityTracker {
    carried_exit: Option<String>,
}

impl ContinuityTracker {
    /// Seed from the route of the ledger's last existing row, if any
    pub fn seeded(last_route: Option<&str>) -> Self {
        ContinuityTracker {
            carried_exit: last_route.and_then(|route| parse_route(route).exit),
        }
    }

    pub fn carried_exit(&self) -> Option<&str> {
        self.carried_exit.as_deref()
    }

    /// Judge the next route in write order and advance the state
    pub fn advance(&mut self, route: &str) -> Verdict {
        let (next, verdict) = step(self.carried_exit.take(), parse_route(route));
        self.carried_exit = next;
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A_TO_B: &str = "入A駅(山手線)出B駅(山手線)";
    const B_TO_C: &str = "入B駅(山手線)出C駅(山手線)";
    const C_TO_D: &str = "入C駅(中央線)出D駅(中央線)";

    #[test]
    fn test_seed_from_last_existing_route() {
        let tracker = ContinuityTracker::seeded(Some(A_TO_B));
        assert_eq!(tracker.carried_exit(), Some("B駅"));

        assert_eq!(ContinuityTracker::seeded(None).carried_exit(), None);
        assert_eq!(ContinuityTracker::seeded(Some("バス")).carried_exit(), None);
    }

    #[test]
    fn test_break_when_exit_and_entry_differ() {
        let mut tracker = ContinuityTracker::seeded(Some(A_TO_B));
        let verdict = tracker.advance(C_TO_D);
        assert_eq!(
            verdict,
            Verdict::Break {
                carried_exit: "B駅".to_string(),
                entry: "C駅".to_string()
            }
        );
        assert_eq!(tracker.carried_exit(), Some("D駅"));
    }

    #[test]
    fn test_continuous_when_exit_equals_entry() {
        let mut tracker = ContinuityTracker::seeded(Some(A_TO_B));
        assert_eq!(tracker.advance(B_TO_C), Verdict::Continuous);
        assert_eq!(tracker.carried_exit(), Some("C駅"));
    }

    #[test]
    fn test_no_prior_exit_never_flags() {
        let mut tracker = ContinuityTracker::default();
        assert_eq!(tracker.advance(C_TO_D), Verdict::Unknown);
        assert_eq!(tracker.carried_exit(), Some("D駅"));
    }

    #[test]
    fn test_unparsed_route_keeps_carried_exit() {
        let mut tracker = ContinuityTracker::seeded(Some(A_TO_B));
        assert_eq!(tracker.advance("バス 都営01系統"), Verdict::Unknown);
        assert_eq!(tracker.carried_exit(), Some("B駅"));

        // the chain resumes against B駅, skipping the unparsed row
        assert!(tracker.advance(C_TO_D).is_break());
    }

    #[test]
    fn test_sequence_judges_only_the_immediate_predecessor() {
        let mut tracker = ContinuityTracker::default();
        let verdicts: Vec<bool> = [A_TO_B, C_TO_D, "入D駅(中央線)出A駅(中央線)", A_TO_B]
            .iter()
            .map(|route| tracker.advance(route).is_break())
            .collect();
        assert_eq!(verdicts, vec![false, true, false, false]);
    }

    #[test]
    fn test_step_is_pure() {
        let stations = parse_route(B_TO_C);
        let (next, verdict) = step(Some("B駅".to_string()), stations.clone());
        assert_eq!(next.as_deref(), Some("C駅"));
        assert_eq!(verdict, Verdict::Continuous);

        let (next, verdict) = step(None, StationPair::unknown());
        assert_eq!(next, None);
        assert_eq!(verdict, Verdict::Unknown);
    }
}

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ledger::{Amount, HolderId, RequestId};

/// Lifecycle of a withdrawal request. `Pending` is the initial state;
/// `Approved` and `Rejected` are terminal and never left.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A proposal to release custodied assets to a requester, gated on a
/// balance-weighted vote of the fund's claim holders.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawRequest {
    pub id: RequestId,
    pub requester: HolderId,
    pub title: String,
    pub amount: Amount,
    pub references: Vec<String>,
    pub votes_for: Amount,
    pub votes_against: Amount,
    pub status: RequestStatus,
    /// Holders who already cast a vote; guards against double voting.
    pub voted: BTreeSet<HolderId>,
}

impl WithdrawRequest {
    pub(crate) fn new(
        id: RequestId,
        requester: HolderId,
        title: String,
        amount: Amount,
        references: Vec<String>,
    ) -> Self {
        Self {
            id,
            requester,
            title,
            amount,
            references,
            votes_for: 0,
            votes_against: 0,
            status: RequestStatus::Pending,
            voted: BTreeSet::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn has_voted(&self, holder: &HolderId) -> bool {
        self.voted.contains(holder)
    }

    /// Add a balance-weighted vote. The caller guarantees the request is
    /// pending and the holder has not voted yet.
    pub(crate) fn record_vote(&mut self, voter: HolderId, in_favor: bool, weight: Amount) {
        if in_favor {
            self.votes_for += weight;
        } else {
            self.votes_against += weight;
        }
        self.voted.insert(voter);
    }

    /// Strict-majority resolution rule: a side wins the moment its tally
    /// exceeds half of the current claim supply. An exact half resolves
    /// nothing. Widened to u128 so doubling a tally cannot wrap.
    pub(crate) fn evaluate(&self, total_supply: Amount) -> Option<RequestStatus> {
        if u128::from(self.votes_for) * 2 > u128::from(total_supply) {
            Some(RequestStatus::Approved)
        } else if u128::from(self.votes_against) * 2 > u128::from(total_supply) {
            Some(RequestStatus::Rejected)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> WithdrawRequest {
        WithdrawRequest::new(0, "bob".into(), "new laptops".into(), 200, vec![])
    }

    #[test]
    fn exact_half_of_supply_does_not_resolve() {
        let mut req = request();
        req.record_vote("alice".into(), true, 500);
        assert_eq!(req.evaluate(1_000), None);
        assert!(req.is_pending());
    }

    #[test]
    fn strict_majority_resolves_for_either_side() {
        let mut approved = request();
        approved.record_vote("alice".into(), true, 501);
        assert_eq!(approved.evaluate(1_000), Some(RequestStatus::Approved));

        let mut rejected = request();
        rejected.record_vote("alice".into(), false, 501);
        assert_eq!(rejected.evaluate(1_000), Some(RequestStatus::Rejected));
    }

    #[test]
    fn tallies_accumulate_per_side_and_track_voters() {
        let mut req = request();
        req.record_vote("alice".into(), true, 300);
        req.record_vote("bob".into(), false, 100);
        req.record_vote("carol".into(), true, 50);

        assert_eq!(req.votes_for, 350);
        assert_eq!(req.votes_against, 100);
        assert!(req.has_voted(&"alice".into()));
        assert!(req.has_voted(&"bob".into()));
        assert!(!req.has_voted(&"dave".into()));
    }

    #[test]
    fn evaluation_survives_full_range_tallies() {
        let mut req = request();
        req.record_vote("whale".into(), true, u64::MAX);
        assert_eq!(req.evaluate(u64::MAX), Some(RequestStatus::Approved));
    }
}

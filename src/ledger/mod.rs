use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::assets::AssetToken;
use crate::claims::ClaimToken;
use crate::withdrawals::{RequestStatus, WithdrawRequest};
use crate::LedgerError;

pub type HolderId = String;
pub type FundId = u64;
pub type RequestId = u64;
pub type Amount = u64;

/// A named pool of custodied asset with its own claim token and
/// withdrawal-request queue.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fund {
    pub id: FundId,
    pub manager: HolderId,
    pub name: String,
    pub description: String,
    pub claim_token: ClaimToken,
    pub is_open: bool,
    /// Opaque metadata pointers, fixed at creation.
    pub references: Vec<String>,
    /// Asset units currently held for this fund. Grows with deposits,
    /// shrinks only through approved withdrawals.
    pub custodied: Amount,
    /// Request id equals its index; entries are never removed.
    pub requests: Vec<WithdrawRequest>,
}

impl Fund {
    pub fn request(&self, request_id: RequestId) -> Result<&WithdrawRequest, LedgerError> {
        self.requests
            .get(request_id as usize)
            .ok_or(LedgerError::UnknownRequest {
                fund_id: self.id,
                request_id,
            })
    }
}

/// Observable record of every state transition, appended in order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    FundCreated {
        fund_id: FundId,
        manager: HolderId,
        name: String,
        symbol: String,
        references: Vec<String>,
    },
    AssetDeposited {
        fund_id: FundId,
        depositor: HolderId,
        amount: Amount,
    },
    ClaimsTransferred {
        fund_id: FundId,
        from: HolderId,
        to: HolderId,
        amount: Amount,
    },
    FundClosedForDeposits {
        fund_id: FundId,
    },
    WithdrawRequestCreated {
        fund_id: FundId,
        request_id: RequestId,
        requester: HolderId,
        amount: Amount,
        title: String,
        references: Vec<String>,
    },
    VoteCast {
        fund_id: FundId,
        request_id: RequestId,
        voter: HolderId,
        in_favor: bool,
        weight: Amount,
    },
    RequestApproved {
        fund_id: FundId,
        request_id: RequestId,
        requester: HolderId,
        amount: Amount,
    },
    RequestRejected {
        fund_id: FundId,
        request_id: RequestId,
    },
}

/// Deep copy of the ledger with a deterministic digest over its contents.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub funds: BTreeMap<FundId, Fund>,
    pub events: Vec<LedgerEvent>,
    pub merkle_root: [u8; 32],
}

/// Process-owned registry of funds and the only writer of fund existence.
///
/// The ledger assumes a serialized, single-writer execution environment:
/// every mutating method takes `&mut self`, runs its checks before its
/// writes, and performs the one fallible external step (the asset transfer)
/// before any ledger state is committed, so a returned error always leaves
/// the prior state intact.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FundLedger {
    /// Asset account holding every fund's pooled deposits.
    custodian: HolderId,
    funds: BTreeMap<FundId, Fund>,
    events: Vec<LedgerEvent>,
}

impl FundLedger {
    pub fn new(custodian: impl Into<HolderId>) -> Self {
        Self {
            custodian: custodian.into(),
            funds: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    pub fn custodian(&self) -> &HolderId {
        &self.custodian
    }

    /// Authoritative registry size. Fund ids are assigned from this counter,
    /// so they are monotonic and never reused.
    pub fn num_funds(&self) -> u64 {
        self.funds.len() as u64
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn fund(&self, fund_id: FundId) -> Result<&Fund, LedgerError> {
        self.funds
            .get(&fund_id)
            .ok_or(LedgerError::UnknownFund { fund_id })
    }

    fn fund_mut(&mut self, fund_id: FundId) -> Result<&mut Fund, LedgerError> {
        self.funds
            .get_mut(&fund_id)
            .ok_or(LedgerError::UnknownFund { fund_id })
    }

    /// Register a new fund together with its claim token.
    pub fn create_fund(
        &mut self,
        manager: &HolderId,
        name: &str,
        description: &str,
        symbol_suffix: &str,
        references: Vec<String>,
    ) -> Result<FundId, LedgerError> {
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidInput("fund name must not be empty"));
        }
        if symbol_suffix.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "claim token symbol suffix must not be empty",
            ));
        }
        let fund_id = self.funds.len() as FundId;
        let claim_token = ClaimToken::new(fund_id, name, symbol_suffix);
        let symbol = claim_token.symbol().to_string();
        self.funds.insert(
            fund_id,
            Fund {
                id: fund_id,
                manager: manager.clone(),
                name: name.to_string(),
                description: description.to_string(),
                claim_token,
                is_open: true,
                references: references.clone(),
                custodied: 0,
                requests: Vec::new(),
            },
        );
        self.events.push(LedgerEvent::FundCreated {
            fund_id,
            manager: manager.clone(),
            name: name.to_string(),
            symbol,
            references,
        });
        Ok(fund_id)
    }

    /// Stop deposits and new withdrawal requests on a fund. Manager only.
    /// Pending requests stay votable so queued withdrawals can still settle.
    pub fn close_fund(&mut self, caller: &HolderId, fund_id: FundId) -> Result<(), LedgerError> {
        let fund = self.fund_mut(fund_id)?;
        if fund.manager != *caller {
            return Err(LedgerError::NotFundManager {
                caller: caller.clone(),
                fund_id,
            });
        }
        if !fund.is_open {
            return Err(LedgerError::FundClosed { fund_id });
        }
        fund.is_open = false;
        self.events.push(LedgerEvent::FundClosedForDeposits { fund_id });
        Ok(())
    }

    pub fn num_fund_references(&self, fund_id: FundId) -> Result<usize, LedgerError> {
        Ok(self.fund(fund_id)?.references.len())
    }

    pub fn fund_reference(&self, fund_id: FundId, index: usize) -> Result<&str, LedgerError> {
        let references = &self.fund(fund_id)?.references;
        references
            .get(index)
            .map(String::as_str)
            .ok_or(LedgerError::IndexOutOfRange {
                index,
                count: references.len(),
            })
    }

    pub fn claim_balance(&self, fund_id: FundId, holder: &HolderId) -> Result<Amount, LedgerError> {
        Ok(self.fund(fund_id)?.claim_token.balance_of(holder))
    }

    /// Pull `amount` of the external asset from the caller into custody and
    /// mint claims 1:1. A failed pull aborts before anything is minted.
    pub fn deposit_asset<A: AssetToken>(
        &mut self,
        asset: &mut A,
        caller: &HolderId,
        fund_id: FundId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput("deposit amount must be positive"));
        }
        let fund = self.fund(fund_id)?;
        if !fund.is_open {
            return Err(LedgerError::FundClosed { fund_id });
        }
        let custodian = self.custodian.clone();
        asset.transfer_from(caller, &custodian, amount)?;
        // the pull succeeded; everything below is infallible
        let fund = self.fund_mut(fund_id)?;
        fund.claim_token.mint(caller, amount);
        fund.custodied += amount;
        self.events.push(LedgerEvent::AssetDeposited {
            fund_id,
            depositor: caller.clone(),
            amount,
        });
        Ok(())
    }

    /// Move claim tokens between holders. Claims stay transferable after a
    /// fund closes; closure only gates deposits and new requests.
    pub fn transfer_claims(
        &mut self,
        caller: &HolderId,
        fund_id: FundId,
        to: &HolderId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput(
                "claim transfer amount must be positive",
            ));
        }
        let fund = self.fund_mut(fund_id)?;
        fund.claim_token.transfer(caller, to, amount)?;
        self.events.push(LedgerEvent::ClaimsTransferred {
            fund_id,
            from: caller.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    /// File a withdrawal request against an open fund. The amount is checked
    /// against the custodied balance at creation time.
    pub fn create_withdraw_request(
        &mut self,
        caller: &HolderId,
        fund_id: FundId,
        amount: Amount,
        title: &str,
        references: Vec<String>,
    ) -> Result<RequestId, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput(
                "withdrawal amount must be positive",
            ));
        }
        if title.trim().is_empty() {
            return Err(LedgerError::InvalidInput(
                "withdraw request title must not be empty",
            ));
        }
        let fund = self.fund_mut(fund_id)?;
        if !fund.is_open {
            return Err(LedgerError::FundClosed { fund_id });
        }
        if amount > fund.custodied {
            return Err(LedgerError::InsufficientFunds { fund_id });
        }
        let request_id = fund.requests.len() as RequestId;
        fund.requests.push(WithdrawRequest::new(
            request_id,
            caller.clone(),
            title.to_string(),
            amount,
            references.clone(),
        ));
        self.events.push(LedgerEvent::WithdrawRequestCreated {
            fund_id,
            request_id,
            requester: caller.clone(),
            amount,
            title: title.to_string(),
            references,
        });
        Ok(request_id)
    }

    /// Cast a vote weighted by the caller's claim balance at this moment.
    ///
    /// The vote is staged on a copy of the request: if it pushes a tally past
    /// half of the claim supply, the triggered payout must succeed before the
    /// vote, the status flip, and the custody debit are committed together.
    /// Any error leaves the request exactly as it was.
    pub fn cast_vote<A: AssetToken>(
        &mut self,
        asset: &mut A,
        caller: &HolderId,
        fund_id: FundId,
        request_id: RequestId,
        in_favor: bool,
    ) -> Result<RequestStatus, LedgerError> {
        let fund = self.fund(fund_id)?;
        let request = fund.request(request_id)?;
        if !request.is_pending() {
            return Err(LedgerError::RequestClosed {
                fund_id,
                request_id,
            });
        }
        if request.has_voted(caller) {
            return Err(LedgerError::AlreadyVoted {
                voter: caller.clone(),
                request_id,
            });
        }
        let weight = fund.claim_token.balance_of(caller);
        if weight == 0 {
            return Err(LedgerError::NotAHolder {
                caller: caller.clone(),
                fund_id,
            });
        }

        let mut staged = request.clone();
        staged.record_vote(caller.clone(), in_favor, weight);
        let verdict = staged.evaluate(fund.claim_token.total_supply());
        let requester = staged.requester.clone();
        let amount = staged.amount;
        let custodied = fund.custodied;

        if let Some(status) = verdict {
            if status == RequestStatus::Approved {
                // earlier approvals may have drained custody since creation
                if custodied < amount {
                    return Err(LedgerError::InsufficientFunds { fund_id });
                }
                asset.transfer(&requester, amount)?;
            }
            staged.status = status;
        }

        let status = staged.status;
        let fund = self.fund_mut(fund_id)?;
        if status == RequestStatus::Approved {
            fund.custodied -= amount;
        }
        if let Some(slot) = fund.requests.get_mut(request_id as usize) {
            *slot = staged;
        }
        self.events.push(LedgerEvent::VoteCast {
            fund_id,
            request_id,
            voter: caller.clone(),
            in_favor,
            weight,
        });
        match status {
            RequestStatus::Approved => self.events.push(LedgerEvent::RequestApproved {
                fund_id,
                request_id,
                requester,
                amount,
            }),
            RequestStatus::Rejected => self.events.push(LedgerEvent::RequestRejected {
                fund_id,
                request_id,
            }),
            RequestStatus::Pending => {}
        }
        Ok(status)
    }

    pub fn num_withdraw_requests(&self, fund_id: FundId) -> Result<u64, LedgerError> {
        Ok(self.fund(fund_id)?.requests.len() as u64)
    }

    pub fn withdraw_request(
        &self,
        fund_id: FundId,
        request_id: RequestId,
    ) -> Result<&WithdrawRequest, LedgerError> {
        self.fund(fund_id)?.request(request_id)
    }

    pub fn num_withdraw_request_references(
        &self,
        fund_id: FundId,
        request_id: RequestId,
    ) -> Result<usize, LedgerError> {
        Ok(self.withdraw_request(fund_id, request_id)?.references.len())
    }

    pub fn withdraw_request_reference(
        &self,
        fund_id: FundId,
        request_id: RequestId,
        index: usize,
    ) -> Result<&str, LedgerError> {
        let references = &self.withdraw_request(fund_id, request_id)?.references;
        references
            .get(index)
            .map(String::as_str)
            .ok_or(LedgerError::IndexOutOfRange {
                index,
                count: references.len(),
            })
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            funds: self.funds.clone(),
            events: self.events.clone(),
            merkle_root: compute_merkle_root(&self.funds),
        }
    }
}

fn compute_merkle_root(funds: &BTreeMap<FundId, Fund>) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::new();
    for (fund_id, fund) in funds {
        let mut hasher = Sha256::new();
        hasher.update(b"fund");
        hasher.update(fund_id.to_le_bytes());
        hasher.update(fund.manager.as_bytes());
        hasher.update(fund.name.as_bytes());
        hasher.update(fund.custodied.to_le_bytes());
        hasher.update([fund.is_open as u8]);
        leaves.push(hasher.finalize().into());
        for (holder, balance) in fund.claim_token.holders() {
            let mut hasher = Sha256::new();
            hasher.update(b"claim");
            hasher.update(fund_id.to_le_bytes());
            hasher.update(holder.as_bytes());
            hasher.update(balance.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
        for request in &fund.requests {
            let mut hasher = Sha256::new();
            hasher.update(b"wreq");
            hasher.update(fund_id.to_le_bytes());
            hasher.update(request.id.to_le_bytes());
            hasher.update(request.requester.as_bytes());
            hasher.update(request.amount.to_le_bytes());
            hasher.update(request.votes_for.to_le_bytes());
            hasher.update(request.votes_against.to_le_bytes());
            hasher.update([request.status as u8]);
            leaves.push(hasher.finalize().into());
        }
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"custody-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

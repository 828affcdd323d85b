use thiserror::Error;

use crate::assets::AssetError;
use crate::ledger::{FundId, HolderId, RequestId};

/// Canonical error type exposed by the ledger operations.
///
/// Every variant aborts the whole triggering operation; no partial state
/// mutation survives a returned error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Empty or zero-valued argument where the domain requires otherwise.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Unknown fund handle.
    #[error("unknown fund {fund_id}")]
    UnknownFund { fund_id: FundId },

    /// Unknown withdrawal request id on an existing fund.
    #[error("unknown withdraw request {request_id} in fund {fund_id}")]
    UnknownRequest { fund_id: FundId, request_id: RequestId },

    /// Reference-list accessor beyond the stored count.
    #[error("reference index {index} out of range, {count} stored")]
    IndexOutOfRange { index: usize, count: usize },

    /// Mutating operation attempted on a closed fund.
    #[error("fund {fund_id} is closed")]
    FundClosed { fund_id: FundId },

    /// Vote attempted on a request already in a terminal state.
    #[error("withdraw request {request_id} in fund {fund_id} is already resolved")]
    RequestClosed { fund_id: FundId, request_id: RequestId },

    /// Withdrawal amount exceeds the fund's custodied balance.
    #[error("insufficient custodied funds in fund {fund_id}")]
    InsufficientFunds { fund_id: FundId },

    /// Claim transfer larger than the holder's balance.
    #[error("insufficient claim balance for {holder}")]
    InsufficientClaims { holder: HolderId },

    /// Second vote by the same holder on one request.
    #[error("{voter} already voted on withdraw request {request_id}")]
    AlreadyVoted { voter: HolderId, request_id: RequestId },

    /// Voter holds no claims on the fund.
    #[error("{caller} holds no claims on fund {fund_id}")]
    NotAHolder { caller: HolderId, fund_id: FundId },

    /// Manager-only action attempted by another caller.
    #[error("{caller} is not the manager of fund {fund_id}")]
    NotFundManager { caller: HolderId, fund_id: FundId },

    /// The asset collaborator refused or failed to move funds.
    #[error("asset transfer failed: {0}")]
    TransferFailed(#[from] AssetError),
}

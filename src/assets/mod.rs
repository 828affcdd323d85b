use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{Amount, HolderId};

/// Capability surface of the external fungible asset the ledger custodies.
///
/// The ledger treats the asset as an opaque collaborator: any failure from
/// these methods aborts the enclosing operation without partial state change.
/// `transfer` moves units out of the custody account the implementation was
/// opened with; `transfer_from` spends the allowance granted to that account.
pub trait AssetToken {
    fn balance_of(&self, holder: &HolderId) -> Amount;

    /// Pay `amount` out of the custody account.
    fn transfer(&mut self, to: &HolderId, amount: Amount) -> Result<(), AssetError>;

    /// Pull `amount` from `from` into `to` on behalf of the custody account.
    fn transfer_from(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
    ) -> Result<(), AssetError>;

    /// Create new units out of thin air. Only exercised by test setups and
    /// the local faucet; a production asset backs this with real issuance.
    fn mint(&mut self, to: &HolderId, amount: Amount);
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("insufficient balance in account {account}")]
    InsufficientBalance { account: HolderId },
    #[error("allowance granted to {operator} by {owner} is too small")]
    InsufficientAllowance { owner: HolderId, operator: HolderId },
}

/// Self-contained fungible token with balance and allowance tables.
///
/// Stands in for the external asset in the test suite and in the CLI state
/// file. The `operator` account is the custody account: `transfer` debits it
/// and `transfer_from` consumes allowances granted to it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InMemoryAsset {
    operator: HolderId,
    balances: BTreeMap<HolderId, Amount>,
    allowances: BTreeMap<HolderId, BTreeMap<HolderId, Amount>>,
}

impl InMemoryAsset {
    pub fn new(operator: impl Into<HolderId>) -> Self {
        Self {
            operator: operator.into(),
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn operator(&self) -> &HolderId {
        &self.operator
    }

    /// Let `operator` pull up to `amount` from `owner`. Overwrites any prior
    /// grant rather than accumulating.
    pub fn approve(&mut self, owner: &HolderId, operator: &HolderId, amount: Amount) {
        self.allowances
            .entry(owner.clone())
            .or_default()
            .insert(operator.clone(), amount);
    }

    pub fn allowance(&self, owner: &HolderId, operator: &HolderId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|grants| grants.get(operator))
            .copied()
            .unwrap_or(0)
    }

    fn move_balance(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
    ) -> Result<(), AssetError> {
        match self.balances.get_mut(from) {
            Some(balance) if *balance >= amount => *balance -= amount,
            _ if amount == 0 => return Ok(()),
            _ => {
                return Err(AssetError::InsufficientBalance {
                    account: from.clone(),
                })
            }
        }
        *self.balances.entry(to.clone()).or_default() += amount;
        Ok(())
    }
}

impl AssetToken for InMemoryAsset {
    fn balance_of(&self, holder: &HolderId) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn transfer(&mut self, to: &HolderId, amount: Amount) -> Result<(), AssetError> {
        let operator = self.operator.clone();
        self.move_balance(&operator, to, amount)
    }

    fn transfer_from(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let operator = self.operator.clone();
        if self.allowance(from, &operator) < amount {
            return Err(AssetError::InsufficientAllowance {
                owner: from.clone(),
                operator,
            });
        }
        self.move_balance(from, to, amount)?;
        if let Some(granted) = self
            .allowances
            .get_mut(from)
            .and_then(|grants| grants.get_mut(&operator))
        {
            *granted -= amount;
        }
        Ok(())
    }

    fn mint(&mut self, to: &HolderId, amount: Amount) {
        *self.balances.entry(to.clone()).or_default() += amount;
    }
}

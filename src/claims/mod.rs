use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ledger::{Amount, HolderId};
use crate::LedgerError;

/// Symbol prefix shared by every claim token. The per-fund suffix supplied
/// at fund creation is appended after a dash.
pub const CLAIM_SYMBOL_PREFIX: &str = "FC";

/// Per-fund fungible accounting unit representing proportional ownership of
/// the fund's pooled deposits.
///
/// Claims mint 1:1 against deposits and are freely transferable between
/// holders. There is no burn: balances persist after custodied assets are
/// released, so `total_supply` records the lifetime deposit volume while the
/// owning fund's `custodied` field tracks what is still held.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimToken {
    id: u64,
    name: String,
    symbol: String,
    balances: BTreeMap<HolderId, Amount>,
    total_supply: Amount,
}

impl ClaimToken {
    /// Build the token record bound to a fund. `id` is the owning fund's id
    /// and is never reassigned.
    pub(crate) fn new(id: u64, fund_name: &str, symbol_suffix: &str) -> Self {
        Self {
            id,
            name: format!("{fund_name} Claim"),
            symbol: format!("{CLAIM_SYMBOL_PREFIX}-{symbol_suffix}"),
            balances: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, holder: &HolderId) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Holders with their current balances, in stable key order.
    pub fn holders(&self) -> impl Iterator<Item = (&HolderId, Amount)> + '_ {
        self.balances.iter().map(|(holder, balance)| (holder, *balance))
    }

    pub(crate) fn mint(&mut self, to: &HolderId, amount: Amount) {
        *self.balances.entry(to.clone()).or_default() += amount;
        self.total_supply += amount;
    }

    pub(crate) fn transfer(
        &mut self,
        from: &HolderId,
        to: &HolderId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        match self.balances.get_mut(from) {
            Some(balance) if *balance >= amount => *balance -= amount,
            _ => {
                return Err(LedgerError::InsufficientClaims {
                    holder: from.clone(),
                })
            }
        }
        *self.balances.entry(to.clone()).or_default() += amount;
        Ok(())
    }
}

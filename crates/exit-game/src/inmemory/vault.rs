//! An in-memory ledger of account balances and the funds held in custody.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::Mutex;
use plasma_primitives::types::{Address, Amount};
use tracing::warn;

use crate::external::{Payout, TransferError, Vault};

#[derive(Debug, Default)]
struct Ledger {
    /// Balances of accounts outside the exit game, keyed by `(token, account)`.
    balances: BTreeMap<(Address, Address), Amount>,

    /// Funds held by the exit game, per token.
    custody: BTreeMap<Address, Amount>,

    /// Set to make every settlement fail.
    reject_settlements: bool,
}

impl Ledger {
    fn balance(&self, token: Address, account: Address) -> Amount {
        self.balances.get(&(token, account)).copied().unwrap_or(0)
    }

    fn custody(&self, token: Address) -> Amount {
        self.custody.get(&token).copied().unwrap_or(0)
    }
}

/// An in-memory [`Vault`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryVault {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryVault {
    /// Creates an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of `token` to an account, e.g. to give it funds to deposit or bond with.
    pub fn mint(&self, token: Address, account: Address, amount: Amount) {
        let mut ledger = self.ledger.lock();
        let balance = ledger.balances.entry((token, account)).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Moves `amount` of `token` from an account into custody, as a deposit into the child chain.
    pub fn deposit(
        &self,
        token: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut ledger = self.ledger.lock();
        let custody = credited(ledger.custody(token), token, Address::NULL, amount)?;
        debit(&mut ledger, token, from, amount)?;
        ledger.custody.insert(token, custody);

        Ok(())
    }

    /// The balance of an account.
    pub fn balance(&self, token: Address, account: Address) -> Amount {
        self.ledger.lock().balance(token, account)
    }

    /// The funds of `token` in custody.
    pub fn custody(&self, token: Address) -> Amount {
        self.ledger.lock().custody(token)
    }

    /// Makes every following settlement fail with [`TransferError::Rejected`] while `reject` is
    /// set.
    pub fn reject_settlements(&self, reject: bool) {
        self.ledger.lock().reject_settlements = reject;
    }
}

fn debit(
    ledger: &mut Ledger,
    token: Address,
    account: Address,
    amount: Amount,
) -> Result<(), TransferError> {
    let available = ledger.balance(token, account);
    if available < amount {
        return Err(TransferError::InsufficientFunds {
            token,
            account,
            needed: amount,
            available,
        });
    }

    ledger.balances.insert((token, account), available - amount);

    Ok(())
}

fn credited(
    balance: Amount,
    token: Address,
    account: Address,
    amount: Amount,
) -> Result<Amount, TransferError> {
    balance.checked_add(amount).ok_or(TransferError::Overflow {
        token,
        account,
        amount,
    })
}

impl Vault for InMemoryVault {
    fn collect(
        &mut self,
        token: Address,
        from: Address,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.deposit(token, from, amount)
    }

    fn settle(&mut self, payouts: &[Payout]) -> Result<(), TransferError> {
        let mut ledger = self.ledger.lock();

        if ledger.reject_settlements {
            warn!(payouts = payouts.len(), "rejecting settlement");
            return Err(TransferError::Rejected(
                "settlements are disabled".to_string(),
            ));
        }

        let mut needed: BTreeMap<Address, Amount> = BTreeMap::new();
        for payout in payouts {
            let total = needed.entry(payout.token).or_default();
            *total = total.saturating_add(payout.amount);
        }

        for (token, needed) in &needed {
            let available = ledger.custody(*token);
            if available < *needed {
                return Err(TransferError::InsufficientFunds {
                    token: *token,
                    account: Address::NULL,
                    needed: *needed,
                    available,
                });
            }
        }

        let mut balances: BTreeMap<(Address, Address), Amount> = BTreeMap::new();
        for payout in payouts.iter().filter(|payout| payout.amount > 0) {
            let key = (payout.token, payout.to);
            let balance = match balances.get(&key) {
                Some(balance) => *balance,
                None => ledger.balance(payout.token, payout.to),
            };
            balances.insert(
                key,
                credited(balance, payout.token, payout.to, payout.amount)?,
            );
        }

        for (token, needed) in needed {
            let available = ledger.custody(token);
            ledger.custody.insert(token, available - needed);
        }
        ledger.balances.extend(balances);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use plasma_test_utils::prelude::*;
    use proptest::prelude::*;

    use super::*;

    const TOKEN: Address = Address::new([9; 20]);
    const ALICE: Address = Address::new([1; 20]);
    const BOB: Address = Address::new([2; 20]);

    #[test]
    fn test_collect_moves_funds_into_custody() {
        let mut vault = InMemoryVault::new();
        vault.mint(TOKEN, ALICE, 10);

        vault.collect(TOKEN, ALICE, 4).unwrap();

        assert_eq!(vault.balance(TOKEN, ALICE), 6);
        assert_eq!(vault.custody(TOKEN), 4);
        assert_eq!(
            vault.collect(TOKEN, ALICE, 7),
            Err(TransferError::InsufficientFunds {
                token: TOKEN,
                account: ALICE,
                needed: 7,
                available: 6,
            })
        );
    }

    #[test]
    fn test_settle_is_all_or_nothing() {
        let mut vault = InMemoryVault::new();
        vault.mint(TOKEN, ALICE, 10);
        vault.deposit(TOKEN, ALICE, 10).unwrap();

        let too_much = [Payout::new(TOKEN, BOB, 6), Payout::new(TOKEN, ALICE, 6)];
        assert!(vault.settle(&too_much).is_err());
        assert_eq!(vault.custody(TOKEN), 10);
        assert_eq!(vault.balance(TOKEN, BOB), 0);

        vault
            .settle(&[Payout::new(TOKEN, BOB, 6), Payout::new(TOKEN, ALICE, 4)])
            .unwrap();
        assert_eq!(vault.custody(TOKEN), 0);
        assert_eq!(vault.balance(TOKEN, BOB), 6);
        assert_eq!(vault.balance(TOKEN, ALICE), 4);
    }

    #[test]
    fn test_rejected_settlement() {
        let mut vault = InMemoryVault::new();
        vault.mint(TOKEN, ALICE, 1);
        vault.deposit(TOKEN, ALICE, 1).unwrap();
        vault.reject_settlements(true);

        assert!(matches!(
            vault.settle(&[Payout::new(TOKEN, BOB, 1)]),
            Err(TransferError::Rejected(_))
        ));
        assert_eq!(vault.custody(TOKEN), 1);
    }

    #[test]
    fn test_overflowing_credits_fail_without_effect() {
        let mut vault = InMemoryVault::new();
        vault.mint(TOKEN, ALICE, Amount::MAX);
        vault.deposit(TOKEN, ALICE, Amount::MAX).unwrap();

        vault.mint(TOKEN, BOB, 1);
        assert_eq!(
            vault.deposit(TOKEN, BOB, 1),
            Err(TransferError::Overflow {
                token: TOKEN,
                account: Address::NULL,
                amount: 1,
            })
        );
        assert_eq!(vault.balance(TOKEN, BOB), 1);
        assert_eq!(vault.custody(TOKEN), Amount::MAX);

        let payouts = [Payout::new(TOKEN, ALICE, 1), Payout::new(TOKEN, BOB, Amount::MAX - 1)];
        vault.settle(&payouts).unwrap();
        assert_eq!(vault.balance(TOKEN, BOB), Amount::MAX);

        vault.mint(TOKEN, ALICE, Amount::MAX - 1);
        vault.deposit(TOKEN, ALICE, Amount::MAX).unwrap();
        assert_eq!(
            vault.settle(&[Payout::new(TOKEN, BOB, Amount::MAX)]),
            Err(TransferError::Overflow {
                token: TOKEN,
                account: BOB,
                amount: Amount::MAX,
            })
        );
        assert_eq!(vault.custody(TOKEN), Amount::MAX);
        assert_eq!(vault.balance(TOKEN, BOB), Amount::MAX);
    }

    proptest! {
        #[test]
        fn settlement_conserves_funds(
            token in arb_address(),
            deposits in prop::collection::vec((arb_address(), arb_amount()), 1..8),
            recipient in arb_address(),
        ) {
            let mut vault = InMemoryVault::new();
            let mut total = 0;
            for (account, amount) in &deposits {
                vault.mint(token, *account, *amount);
                vault.collect(token, *account, *amount).unwrap();
                total += amount;
            }

            prop_assert_eq!(vault.custody(token), total);

            let payouts: Vec<_> = deposits
                .iter()
                .map(|(_, amount)| Payout::new(token, recipient, *amount))
                .collect();
            vault.settle(&payouts).unwrap();

            prop_assert_eq!(vault.custody(token), 0);
            prop_assert_eq!(vault.balance(token, recipient), total);
        }
    }
}

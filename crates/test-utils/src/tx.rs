//! Builders for signed transactions.

use plasma_primitives::{
    tx::{Transaction, TxOutput},
    types::{Address, Amount},
    utxo::UtxoPos,
};
use secp256k1::SecretKey;

/// Creates a deposit of `amount` of `token` to `owner`.
pub fn deposit_tx(owner: Address, token: Address, amount: Amount) -> Transaction {
    Transaction::new(vec![], vec![TxOutput::new(owner, token, amount)], vec![])
        .expect("a deposit has a single output")
}

/// Creates a transaction spending `inputs` into `outputs`, signing input `i` with `keys[i]`.
///
/// # Panics
///
/// If there are more than 4 inputs or outputs, or fewer keys than inputs.
pub fn spend_tx(inputs: &[UtxoPos], keys: &[SecretKey], outputs: &[TxOutput]) -> Transaction {
    assert!(keys.len() >= inputs.len(), "every input must have a key");

    let mut tx = Transaction::new(inputs.to_vec(), outputs.to_vec(), vec![])
        .expect("must be able to build the transaction");

    for (slot, key) in keys.iter().take(inputs.len()).enumerate() {
        tx.sign(slot, key).expect("slot must be in range");
    }

    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::TestAccount;

    #[test]
    fn test_spend_tx_is_signed_by_input_owners() {
        let alice = TestAccount::from_seed("alice");
        let bob = TestAccount::from_seed("bob");
        let inputs = [
            UtxoPos::new(1, 0, 0).unwrap(),
            UtxoPos::new(2, 0, 0).unwrap(),
        ];

        let tx = spend_tx(
            &inputs,
            &[alice.key, bob.key],
            &[TxOutput::new(alice.address, Address::NATIVE_TOKEN, 10)],
        );

        assert_eq!(tx.signers()[0], alice.address);
        assert_eq!(tx.signers()[1], bob.address);
        assert!(tx.signers()[2].is_null());
        assert!(!tx.is_deposit());
        assert!(deposit_tx(alice.address, Address::NATIVE_TOKEN, 1).is_deposit());
    }
}

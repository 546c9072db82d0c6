//! The fixed-shape Plasma transaction.
//!
//! Every transaction has exactly [`NUM_TXOS`] input slots and [`NUM_TXOS`] output slots. Unused
//! slots hold null placeholders so that the encoding, and therefore the hash, never depends on how
//! many slots a transaction actually uses.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{NUM_TXOS, SIGNING_DOMAIN_TAG},
    errors::{EncodingError, TransactionError},
    secp::{recover_signer, sign_digest, Signature},
    types::{Address, Amount, TxHash},
    utxo::UtxoPos,
};

/// An output of a transaction.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
    Arbitrary,
)]
pub struct TxOutput {
    /// The address that can spend this output.
    pub owner: Address,

    /// The token this output is denominated in; [`Address::NATIVE_TOKEN`] for the native currency.
    pub token: Address,

    /// The value of the output.
    pub amount: Amount,
}

impl TxOutput {
    /// The null output, used to fill unused output slots.
    pub const NULL: TxOutput = TxOutput {
        owner: Address::NULL,
        token: Address::NULL,
        amount: 0,
    };

    /// Creates a new output.
    pub const fn new(owner: Address, token: Address, amount: Amount) -> Self {
        Self {
            owner,
            token,
            amount,
        }
    }

    /// Whether this output is a placeholder.
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.owner.is_null()
    }
}

/// The wire representation of a transaction: the body followed by one signature per input slot.
#[derive(BorshSerialize, BorshDeserialize)]
struct SignedTx {
    inputs: [UtxoPos; NUM_TXOS],
    outputs: [TxOutput; NUM_TXOS],
    metadata: Vec<u8>,
    signatures: [Signature; NUM_TXOS],
}

/// A Plasma transaction together with its signatures and the signers recovered from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    inputs: [UtxoPos; NUM_TXOS],
    outputs: [TxOutput; NUM_TXOS],
    metadata: Vec<u8>,
    signatures: [Signature; NUM_TXOS],
    signers: [Address; NUM_TXOS],
}

impl Transaction {
    /// Creates an unsigned transaction, padding inputs and outputs with null placeholders.
    pub fn new(
        inputs: Vec<UtxoPos>,
        outputs: Vec<TxOutput>,
        metadata: Vec<u8>,
    ) -> Result<Self, TransactionError> {
        if inputs.len() > NUM_TXOS {
            return Err(TransactionError::TooManyInputs(inputs.len()));
        }

        if outputs.len() > NUM_TXOS {
            return Err(TransactionError::TooManyOutputs(outputs.len()));
        }

        let mut padded_inputs = [UtxoPos::NULL; NUM_TXOS];
        padded_inputs[..inputs.len()].copy_from_slice(&inputs);

        let mut padded_outputs = [TxOutput::NULL; NUM_TXOS];
        padded_outputs[..outputs.len()].copy_from_slice(&outputs);

        Ok(Self {
            inputs: padded_inputs,
            outputs: padded_outputs,
            metadata,
            signatures: [Signature::NULL; NUM_TXOS],
            signers: [Address::NULL; NUM_TXOS],
        })
    }

    /// The input slots.
    pub const fn inputs(&self) -> &[UtxoPos; NUM_TXOS] {
        &self.inputs
    }

    /// The output slots.
    pub const fn outputs(&self) -> &[TxOutput; NUM_TXOS] {
        &self.outputs
    }

    /// The opaque metadata.
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    /// The signature of every input slot.
    pub const fn signatures(&self) -> &[Signature; NUM_TXOS] {
        &self.signatures
    }

    /// The signer recovered for every input slot, [`Address::NULL`] for unsigned slots.
    pub const fn signers(&self) -> &[Address; NUM_TXOS] {
        &self.signers
    }

    /// Iterates over the non-null input slots.
    pub fn spent_inputs(&self) -> impl Iterator<Item = (usize, UtxoPos)> + '_ {
        self.inputs
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, pos)| !pos.is_null())
    }

    /// A deposit creates value on the child chain, so none of its inputs point into a block.
    pub fn is_deposit(&self) -> bool {
        self.inputs.iter().all(|input| input.blknum() == 0)
    }

    /// The identity of the transaction: the digest of its canonical body encoding.
    ///
    /// Signatures are not part of the hash.
    pub fn hash(&self) -> TxHash {
        let mut body = Vec::new();
        BorshSerialize::serialize(&(&self.inputs, &self.outputs, &self.metadata), &mut body)
            .expect("writing to a vec must not fail");

        TxHash::digest(body)
    }

    /// The digest that input owners sign.
    pub fn signing_hash(&self) -> TxHash {
        let hash = self.hash();

        let mut preimage = Vec::with_capacity(SIGNING_DOMAIN_TAG.len() + hash.as_bytes().len());
        preimage.extend_from_slice(SIGNING_DOMAIN_TAG);
        preimage.extend_from_slice(hash.as_bytes());

        TxHash::digest(preimage)
    }

    /// Signs the given input slot and records the recovered signer.
    pub fn sign(&mut self, slot: usize, key: &SecretKey) -> Result<(), TransactionError> {
        let signature = sign_digest(&self.signing_hash(), key);

        self.attach_signature(slot, signature)
    }

    /// Attaches an externally produced signature to the given input slot.
    ///
    /// A null signature yields a null signer.
    pub fn attach_signature(
        &mut self,
        slot: usize,
        signature: Signature,
    ) -> Result<(), TransactionError> {
        if slot >= NUM_TXOS {
            return Err(TransactionError::SlotOutOfRange(slot));
        }

        let signer = recover_signer(&self.signing_hash(), &signature)
            .ok_or(TransactionError::InvalidSignature { slot })?;

        self.signatures[slot] = signature;
        self.signers[slot] = signer;

        Ok(())
    }

    /// Serializes the transaction with its signatures.
    pub fn encode(&self) -> Vec<u8> {
        let wire = SignedTx {
            inputs: self.inputs,
            outputs: self.outputs,
            metadata: self.metadata.clone(),
            signatures: self.signatures,
        };

        borsh::to_vec(&wire).expect("writing to a vec must not fail")
    }

    /// Deserializes a transaction and recovers the signer of every input slot.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionError> {
        let wire: SignedTx = borsh::from_slice(bytes)
            .map_err(|e| TransactionError::Encoding(EncodingError::Malformed(e.to_string())))?;

        let mut tx = Self {
            inputs: wire.inputs,
            outputs: wire.outputs,
            metadata: wire.metadata,
            signatures: [Signature::NULL; NUM_TXOS],
            signers: [Address::NULL; NUM_TXOS],
        };

        for (slot, signature) in wire.signatures.into_iter().enumerate() {
            tx.attach_signature(slot, signature)?;
        }

        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{generate_address, generate_keypair};

    fn sample_tx(owner: Address) -> Transaction {
        Transaction::new(
            vec![UtxoPos::new(1, 0, 0).unwrap(), UtxoPos::new(2, 1, 3).unwrap()],
            vec![
                TxOutput::new(owner, Address::NATIVE_TOKEN, 67),
                TxOutput::new(generate_address(), Address::NATIVE_TOKEN, 33),
            ],
            b"memo".to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_pads_slots() {
        let tx = sample_tx(generate_address());

        assert!(tx.inputs()[2].is_null());
        assert!(tx.inputs()[3].is_null());
        assert!(tx.outputs()[2].is_empty());
        assert_eq!(tx.spent_inputs().count(), 2);
        assert!(tx.signers().iter().all(Address::is_null));
    }

    #[test]
    fn test_new_rejects_too_many_slots() {
        let five_inputs = vec![UtxoPos::NULL; NUM_TXOS + 1];
        assert_eq!(
            Transaction::new(five_inputs, vec![], vec![]),
            Err(TransactionError::TooManyInputs(NUM_TXOS + 1))
        );

        let five_outputs = vec![TxOutput::NULL; NUM_TXOS + 1];
        assert_eq!(
            Transaction::new(vec![], five_outputs, vec![]),
            Err(TransactionError::TooManyOutputs(NUM_TXOS + 1))
        );
    }

    #[test]
    fn test_is_deposit() {
        let owner = generate_address();
        let deposit = Transaction::new(
            vec![],
            vec![TxOutput::new(owner, Address::NATIVE_TOKEN, 100)],
            vec![],
        )
        .unwrap();

        assert!(deposit.is_deposit());
        assert!(!sample_tx(owner).is_deposit());
    }

    #[test]
    fn test_hash_ignores_signatures() {
        let (sk, owner) = generate_keypair();
        let mut tx = sample_tx(owner);
        let unsigned_hash = tx.hash();

        tx.sign(0, &sk).unwrap();

        assert_eq!(tx.hash(), unsigned_hash);
        assert_ne!(tx.signing_hash(), unsigned_hash);
    }

    #[test]
    fn test_hash_depends_on_metadata() {
        let owner = generate_address();
        let tx = sample_tx(owner);
        let mut other = tx.clone();
        other.metadata = b"other".to_vec();

        assert_ne!(tx.hash(), other.hash());
    }

    #[test]
    fn test_sign_records_signer() {
        let (sk, owner) = generate_keypair();
        let mut tx = sample_tx(owner);

        tx.sign(1, &sk).unwrap();

        assert_eq!(tx.signers()[1], owner);
        assert!(tx.signers()[0].is_null());
        assert_eq!(
            tx.sign(NUM_TXOS, &sk),
            Err(TransactionError::SlotOutOfRange(NUM_TXOS))
        );
    }

    #[test]
    fn test_null_signature_yields_null_signer() {
        let (sk, owner) = generate_keypair();
        let mut tx = sample_tx(owner);
        tx.sign(0, &sk).unwrap();

        tx.attach_signature(0, Signature::NULL).unwrap();

        assert!(tx.signers()[0].is_null());
    }

    #[test]
    fn test_decode_recovers_signers() {
        let (sk, owner) = generate_keypair();
        let mut tx = sample_tx(owner);
        tx.sign(0, &sk).unwrap();

        let decoded = Transaction::decode(&tx.encode()).unwrap();

        assert_eq!(decoded, tx);
        assert_eq!(decoded.signers()[0], owner);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let owner = generate_address();
        let mut bytes = sample_tx(owner).encode();
        bytes.truncate(bytes.len() - 1);

        assert!(matches!(
            Transaction::decode(&bytes),
            Err(TransactionError::Encoding(EncodingError::Malformed(_)))
        ));
    }
}

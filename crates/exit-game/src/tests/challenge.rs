use plasma_params::prelude::{ChallengeBondPolicy, ExitGameParams};
use plasma_primitives::types::Address;
use plasma_test_utils::prelude::*;

use crate::{
    errors::ExitGameError,
    events::ExitEvent,
    piggyback::Slot,
    requests::ChallengeStandardExit,
    store::ExitStatus,
    testing::{output, Harness, TOKEN},
};

#[test]
fn test_challenge_spent_output() {
    let mut harness = Harness::new();
    let alice = TestAccount::from_seed("alice");
    let bob = TestAccount::from_seed("bob");
    harness.game.add_token(TOKEN).unwrap();

    let pos = harness.deposit(&alice, TOKEN, 100);
    let spend = harness.spend(&[pos], &[&alice], &[output(&bob, TOKEN, 100)]);
    harness.include_one(&spend);

    harness.start_standard_exit(&alice, pos).unwrap();
    harness.game.drain_events();

    harness
        .game
        .challenge_standard_exit(
            bob.address,
            ChallengeStandardExit {
                utxo_pos: pos,
                spending_tx: spend.encode(),
                input_index: 0,
            },
        )
        .unwrap();

    let exit = harness.game.standard_exit(&pos).unwrap();
    assert_eq!(exit.status, ExitStatus::Challenged);
    assert_eq!(exit.amount, 0);
    assert_eq!(
        harness.balance(Address::NATIVE_TOKEN, &bob),
        harness.params.standard_exit_bond,
        "the challenger takes the bond"
    );
    assert_eq!(
        harness.game.drain_events(),
        vec![ExitEvent::ExitChallenged {
            utxo_pos: pos,
            challenger: bob.address,
        }]
    );

    // the queue entry is stale: consumed without paying anyone
    harness.advance(2 * harness.period());
    assert_eq!(harness.process(TOKEN, 10), Ok(1));
    assert_eq!(harness.balance(TOKEN, &alice), 0);
    assert_eq!(harness.vault.custody(TOKEN), 100);
    assert!(harness.game.drain_events().is_empty());
    assert_eq!(harness.game.state().queues.len(&TOKEN), Ok(0));
}

#[test]
fn test_retained_challenge_bond() {
    let mut harness = Harness::with_params(ExitGameParams {
        challenge_bond_policy: ChallengeBondPolicy::Retained,
        ..Default::default()
    });
    let alice = TestAccount::from_seed("alice");
    let bob = TestAccount::from_seed("bob");

    let pos = harness.deposit(&alice, Address::NATIVE_TOKEN, 100);
    let spend = harness.spend(&[pos], &[&alice], &[output(&bob, Address::NATIVE_TOKEN, 100)]);
    harness.start_standard_exit(&alice, pos).unwrap();

    harness
        .game
        .challenge_standard_exit(
            bob.address,
            ChallengeStandardExit {
                utxo_pos: pos,
                spending_tx: spend.encode(),
                input_index: 0,
            },
        )
        .unwrap();

    assert_eq!(harness.balance(Address::NATIVE_TOKEN, &bob), 0);
    assert_eq!(
        harness.vault.custody(Address::NATIVE_TOKEN),
        100 + harness.params.standard_exit_bond
    );
}

#[test]
fn test_invalid_challenges() {
    let mut harness = Harness::new();
    let alice = TestAccount::from_seed("alice");
    let bob = TestAccount::from_seed("bob");

    let pos = harness.deposit(&alice, Address::NATIVE_TOKEN, 100);
    let other = harness.deposit(&bob, Address::NATIVE_TOKEN, 100);
    let spend = harness.spend(
        &[other, pos],
        &[&bob, &alice],
        &[output(&bob, Address::NATIVE_TOKEN, 200)],
    );
    let challenge = |input_index| ChallengeStandardExit {
        utxo_pos: pos,
        spending_tx: spend.encode(),
        input_index,
    };

    assert!(
        matches!(
            harness.game.challenge_standard_exit(bob.address, challenge(1)),
            Err(ExitGameError::NotChallengeable(_))
        ),
        "there is no exit to challenge yet"
    );

    harness.start_standard_exit(&alice, pos).unwrap();

    assert!(matches!(
        harness.game.challenge_standard_exit(bob.address, challenge(0)),
        Err(ExitGameError::NotChallengeable(_))
    ));
    assert_eq!(
        harness.game.challenge_standard_exit(bob.address, challenge(4)),
        Err(ExitGameError::InvalidSlot(Slot::Input(4)))
    );

    let forged = harness.spend(&[pos], &[&bob], &[output(&bob, Address::NATIVE_TOKEN, 100)]);
    assert!(matches!(
        harness.game.challenge_standard_exit(
            bob.address,
            ChallengeStandardExit {
                utxo_pos: pos,
                spending_tx: forged.encode(),
                input_index: 0,
            }
        ),
        Err(ExitGameError::NotChallengeable(_))
    ));
    assert!(harness.game.standard_exit(&pos).unwrap().is_active());

    harness.advance(2 * harness.period());
    assert_eq!(harness.process(Address::NATIVE_TOKEN, 10), Ok(1));

    assert!(
        matches!(
            harness.game.challenge_standard_exit(bob.address, challenge(1)),
            Err(ExitGameError::NotChallengeable(_))
        ),
        "a finalized exit can no longer be challenged"
    );
    assert_eq!(
        harness.balance(Address::NATIVE_TOKEN, &alice),
        100 + harness.params.standard_exit_bond
    );
}

#[test]
fn test_challenge_takes_precedence_over_maturity() {
    let mut harness = Harness::new();
    let alice = TestAccount::from_seed("alice");
    let bob = TestAccount::from_seed("bob");

    let pos = harness.deposit(&alice, Address::NATIVE_TOKEN, 100);
    let spend = harness.spend(&[pos], &[&alice], &[output(&bob, Address::NATIVE_TOKEN, 100)]);
    harness.start_standard_exit(&alice, pos).unwrap();

    // mature but not yet processed
    harness.advance(2 * harness.period());
    harness
        .game
        .challenge_standard_exit(
            bob.address,
            ChallengeStandardExit {
                utxo_pos: pos,
                spending_tx: spend.encode(),
                input_index: 0,
            },
        )
        .unwrap();

    assert_eq!(harness.process(Address::NATIVE_TOKEN, 10), Ok(1));
    assert_eq!(harness.balance(Address::NATIVE_TOKEN, &alice), 0);
    assert_eq!(
        harness.game.standard_exit(&pos).unwrap().status,
        ExitStatus::Challenged
    );
}

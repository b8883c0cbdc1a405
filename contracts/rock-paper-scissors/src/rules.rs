//! Move normalization and the win rule, written once over [`EncryptedU8`].

use soroban_sdk::contracttype;

use crate::fhe::EncryptedU8;

/// Size of the move domain; moves are residues mod 3.
pub const MOVE_COUNT: u8 = 3;

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Move {
    Rock     = 0,
    Paper    = 1,
    Scissors = 2,
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Outcome {
    Draw        = 0,
    Player1Wins = 1,
    Player2Wins = 2,
}

/// Fold any 8-bit value into {Rock, Paper, Scissors}. Out-of-range input is
/// reduced, never rejected.
pub fn normalize<F: EncryptedU8>(fhe: &F, raw: &F::Value) -> F::Value {
    fhe.rem_scalar(raw, MOVE_COUNT)
}

/// Encrypted outcome of `a` (player 1) against `b` (player 2).
///
/// `a` beats `b` exactly when `a == (b + 1) mod 3`: Paper over Rock,
/// Scissors over Paper, Rock over Scissors. Both inputs must already be
/// normalized.
pub fn resolve<F: EncryptedU8>(fhe: &F, a: &F::Value, b: &F::Value) -> F::Value {
    let draw = fhe.eq(a, b);
    let beaten_by_a = fhe.rem_scalar(&fhe.add_scalar(b, 1), MOVE_COUNT);
    let p1_wins = fhe.eq(a, &beaten_by_a);

    let decided = fhe.select(
        &p1_wins,
        &fhe.constant(Outcome::Player1Wins as u8),
        &fhe.constant(Outcome::Player2Wins as u8),
    );
    fhe.select(&draw, &fhe.constant(Outcome::Draw as u8), &decided)
}

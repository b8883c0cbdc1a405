#![no_std]

//! # Confidential Rock-Paper-Scissors Contract
//!
//! Players submit encrypted moves; the winner is computed homomorphically by
//! an FHE coprocessor and never decrypted on-chain. Each player may decrypt
//! only their own move, and the outcome is opened to everyone once the
//! second move lands.
//!
//! Lifecycle: `Created -> Player1Submitted -> Resolved`. The second move
//! resolves the session in the same invocation; there is no resolve call.

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, log, vec, Address,
    Bytes, BytesN, Env, Vec,
};

pub mod access;
pub mod fhe;
pub mod rules;


pub use access::{Field, Grant, Grantee};
pub use fhe::Handle;
pub use rules::{Move, Outcome};

use fhe::Coprocessor;

// ============================================================================
// Errors
// ============================================================================

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    NotFound     = 1,
    InvalidState = 2,
    Unauthorized = 3,
    InvalidProof = 4,
}

// ============================================================================
// Data Types
// ============================================================================

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Status {
    Created          = 0,
    Player1Submitted = 1,
    Resolved         = 2,
}

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Role {
    Observer = 0,
    Player1  = 1,
    Player2  = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    pub id:          u32,
    pub player1:     Address,
    pub player2:     Option<Address>,
    // Coprocessor holding this session's ciphertexts, pinned at creation.
    pub coprocessor: Address,
    // Ciphertext handles; write-once.
    pub move1:       Option<Handle>,
    pub move2:       Option<Handle>,
    pub outcome:     Option<Handle>,
    pub status:      Status,
    pub created_at:  u64,
    pub resolved_at: Option<u64>,
    pub grants:      Vec<Grant>,
}

impl Session {
    pub fn handle(&self, field: Field) -> Option<Handle> {
        match field {
            Field::Move1   => self.move1.clone(),
            Field::Move2   => self.move2.clone(),
            Field::Outcome => self.outcome.clone(),
        }
    }
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Session(u32),
    NextId,
    Coprocessor,
    Admin,
}

const SESSION_TTL_LEDGERS: u32 = 518_400; // ~30 days, bumped on every write
const FIRST_SESSION_ID:    u32 = 1;

// ============================================================================
// Events
// ============================================================================

#[contractevent]
pub struct SessionCreated {
    #[topic]
    pub id:      u32,
    #[topic]
    pub player1: Address,
}

#[contractevent]
pub struct MoveSubmitted {
    #[topic]
    pub id:     u32,
    #[topic]
    pub player: Address,
}

#[contractevent]
pub struct SessionResolved {
    #[topic]
    pub id: u32,
}

// ============================================================================
// Storage helpers
// ============================================================================

fn load_session(env: &Env, session_id: u32) -> Result<Session, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Session(session_id))
        .ok_or(Error::NotFound)
}

fn save_session(env: &Env, session: &Session) {
    let key = DataKey::Session(session.id);
    env.storage().persistent().set(&key, session);
    env.storage()
        .persistent()
        .extend_ttl(&key, SESSION_TTL_LEDGERS, SESSION_TTL_LEDGERS);
}

fn current_coprocessor(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Coprocessor)
        .expect("Coprocessor not set")
}

fn admin(env: &Env) -> Address {
    env.storage().instance().get(&DataKey::Admin).expect("Admin not set")
}

/// Proof check plus mod-3 reduction. The proof binds the input to this
/// contract, the submitting player and this session.
fn ingest_move(
    fhe: &Coprocessor,
    session_id: u32,
    player: &Address,
    encrypted_move: &Handle,
    proof: &Bytes,
) -> Result<Handle, Error> {
    let raw = fhe.verify_input(encrypted_move, proof, player, session_id)?;
    Ok(rules::normalize(fhe, &raw))
}

// ============================================================================
// Contract
// ============================================================================

#[contract]
pub struct RockPaperScissorsContract;

#[contractimpl]
impl RockPaperScissorsContract {

    /// Deploy with an admin and the FHE coprocessor new sessions will use.
    pub fn __constructor(env: Env, admin: Address, coprocessor: Address) {
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Coprocessor, &coprocessor);
        env.storage().instance().set(&DataKey::NextId, &FIRST_SESSION_ID);
    }

    // ========================================================================
    // create_session
    // ========================================================================

    /// Open a new session with `caller` as player1. Fails only once the id
    /// space is spent.
    pub fn create_session(env: Env, caller: Address) -> Result<u32, Error> {
        caller.require_auth();

        let id = Self::next_id(env.clone());
        let next = id.checked_add(1).ok_or(Error::InvalidState)?;
        let session = Session {
            id,
            player1: caller.clone(),
            player2: None,
            coprocessor: current_coprocessor(&env),
            move1: None,
            move2: None,
            outcome: None,
            status: Status::Created,
            created_at: env.ledger().timestamp(),
            resolved_at: None,
            grants: vec![&env],
        };

        save_session(&env, &session);
        env.storage().instance().set(&DataKey::NextId, &next);
        env.storage()
            .instance()
            .extend_ttl(SESSION_TTL_LEDGERS, SESSION_TTL_LEDGERS);

        SessionCreated { id, player1: caller }.publish(&env);
        Ok(id)
    }

    // ========================================================================
    // submit_move
    // ========================================================================

    /// Submit an encrypted move.
    ///
    /// In `Created` only player1 may move. In `Player1Submitted` anyone but
    /// player1 may move; that caller becomes player2 and the session is
    /// resolved on the spot. Everything is checked before anything is
    /// written, and a failure leaves the session untouched.
    pub fn submit_move(
        env: Env,
        session_id: u32,
        caller: Address,
        encrypted_move: BytesN<32>,
        proof: Bytes,
    ) -> Result<(), Error> {
        caller.require_auth();

        let mut session = load_session(&env, session_id)?;
        let fhe = Coprocessor::new(&env, &session.coprocessor);

        match session.status {
            Status::Resolved => {
                log!(&env, "submit_move: session {} already resolved", session_id);
                return Err(Error::InvalidState);
            }

            Status::Created => {
                if caller != session.player1 {
                    log!(&env, "submit_move: player1 must move first in {}", session_id);
                    return Err(Error::Unauthorized);
                }

                let move1 = ingest_move(&fhe, session_id, &caller, &encrypted_move, &proof)?;
                session.move1 = Some(move1);
                access::open(&fhe, &mut session, Field::Move1)?;
                session.status = Status::Player1Submitted;

                save_session(&env, &session);
                MoveSubmitted { id: session_id, player: caller }.publish(&env);
            }

            Status::Player1Submitted => {
                if caller == session.player1 {
                    log!(&env, "submit_move: no self-play in {}", session_id);
                    return Err(Error::Unauthorized);
                }
                let move1 = session.move1.clone().ok_or(Error::InvalidState)?;

                let move2 = ingest_move(&fhe, session_id, &caller, &encrypted_move, &proof)?;
                let outcome = rules::resolve(&fhe, &move1, &move2);

                session.player2 = Some(caller.clone());
                session.move2 = Some(move2);
                session.outcome = Some(outcome);
                access::open(&fhe, &mut session, Field::Move2)?;
                access::open(&fhe, &mut session, Field::Outcome)?;
                session.status = Status::Resolved;
                session.resolved_at = Some(env.ledger().timestamp());

                save_session(&env, &session);
                MoveSubmitted { id: session_id, player: caller }.publish(&env);
                SessionResolved { id: session_id }.publish(&env);
            }
        }

        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Every field of the session, handles included. Reading a handle is
    /// unconditional; decrypting it is up to the coprocessor's ACL.
    pub fn get_session(env: Env, session_id: u32) -> Result<Session, Error> {
        load_session(&env, session_id)
    }

    pub fn next_id(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&DataKey::NextId)
            .unwrap_or(FIRST_SESSION_ID)
    }

    /// Most recently created session, if any.
    pub fn latest_session(env: Env) -> Option<u32> {
        let next = Self::next_id(env);
        if next > FIRST_SESSION_ID { Some(next - 1) } else { None }
    }

    pub fn role_of(env: Env, session_id: u32, account: Address) -> Result<Role, Error> {
        let session = load_session(&env, session_id)?;
        if account == session.player1 {
            Ok(Role::Player1)
        } else if session.player2 == Some(account) {
            Ok(Role::Player2)
        } else {
            Ok(Role::Observer)
        }
    }

    /// Whether the session's grant list lets `account` decrypt `field`.
    pub fn can_decrypt(
        env: Env,
        session_id: u32,
        field: Field,
        account: Address,
    ) -> Result<bool, Error> {
        let session = load_session(&env, session_id)?;
        Ok(access::is_granted(&session.grants, field, &account))
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub fn get_admin(env: Env) -> Address {
        admin(&env)
    }

    pub fn set_admin(env: Env, new_admin: Address) {
        admin(&env).require_auth();
        env.storage().instance().set(&DataKey::Admin, &new_admin);
    }

    pub fn get_coprocessor(env: Env) -> Address {
        current_coprocessor(&env)
    }

    /// Applies to sessions created from now on. Open sessions keep the
    /// coprocessor they were created with.
    pub fn set_coprocessor(env: Env, new_coprocessor: Address) {
        admin(&env).require_auth();
        env.storage()
            .instance()
            .set(&DataKey::Coprocessor, &new_coprocessor);
    }

    pub fn upgrade(env: Env, new_wasm_hash: BytesN<32>) {
        admin(&env).require_auth();
        env.deployer().update_current_contract_wasm(new_wasm_hash);
    }
}

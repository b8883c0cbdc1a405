#![no_std]

//! # Mock FHE Coprocessor
//!
//! Plaintext stand-in for an FHE coprocessor. Every ciphertext is an opaque
//! 32-byte handle; the plaintext behind it lives in contract storage and is
//! only released through `decrypt`, which checks the handle's ACL.
//!
//! Every operation names its `caller` (the contract doing the computation).
//! The caller must hold an ACL entry on each operand, and is granted the
//! result automatically.

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, xdr::ToXdr, Address, Bytes,
    BytesN, Env,
};


// ============================================================================
// Errors
// ============================================================================

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    UnknownHandle  = 1,
    NotAllowed     = 2,
    InvalidProof   = 3,
    TypeMismatch   = 4,
    DivisionByZero = 5,
}

// ============================================================================
// Data Types
// ============================================================================

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum CipherKind {
    Bool = 0,
    U8   = 1,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Ciphertext {
    pub kind:  CipherKind,
    pub value: u32,
}

/// What a client hands to a contract: the input handle plus the proof that
/// binds it to (contract, user, session).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncryptedInput {
    pub handle: BytesN<32>,
    pub proof:  Bytes,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Counter,
    Input(BytesN<32>),
    Cipher(BytesN<32>),
    Acl(BytesN<32>, Address),
    Public(BytesN<32>),
}

const HANDLE_TTL_LEDGERS: u32 = 518_400; // ~30 days

// ============================================================================
// Storage helpers
// ============================================================================

fn fresh_handle(env: &Env) -> BytesN<32> {
    let counter: u64 = env.storage().instance().get(&DataKey::Counter).unwrap_or(0);
    env.storage().instance().set(&DataKey::Counter, &(counter + 1));

    let mut preimage = Bytes::from_slice(env, b"mock-fhe-handle");
    preimage.append(&env.current_contract_address().to_xdr(env));
    preimage.append(&Bytes::from_array(env, &counter.to_be_bytes()));
    env.crypto().sha256(&preimage).to_bytes()
}

/// proof = sha256(handle || contract || user || session_id)
fn input_proof(
    env: &Env,
    handle: &BytesN<32>,
    contract: &Address,
    user: &Address,
    session_id: u32,
) -> Bytes {
    let mut preimage = Bytes::from(handle.clone());
    preimage.append(&contract.clone().to_xdr(env));
    preimage.append(&user.clone().to_xdr(env));
    preimage.append(&Bytes::from_array(env, &session_id.to_be_bytes()));
    Bytes::from(env.crypto().sha256(&preimage).to_bytes())
}

fn grant(env: &Env, handle: &BytesN<32>, account: &Address) {
    let key = DataKey::Acl(handle.clone(), account.clone());
    env.storage().persistent().set(&key, &true);
    env.storage().persistent().extend_ttl(&key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);
}

fn allowed(env: &Env, handle: &BytesN<32>, account: &Address) -> bool {
    env.storage().persistent().has(&DataKey::Public(handle.clone()))
        || env
            .storage()
            .persistent()
            .has(&DataKey::Acl(handle.clone(), account.clone()))
}

fn store(env: &Env, caller: &Address, ciphertext: Ciphertext) -> BytesN<32> {
    let handle = fresh_handle(env);
    let key = DataKey::Cipher(handle.clone());
    env.storage().persistent().set(&key, &ciphertext);
    env.storage().persistent().extend_ttl(&key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);
    grant(env, &handle, caller);
    handle
}

/// Operand access: the handle must exist, the caller must be on its ACL,
/// and the ciphertext must carry the expected kind.
fn operand(
    env: &Env,
    caller: &Address,
    handle: &BytesN<32>,
    kind: CipherKind,
) -> Result<u32, Error> {
    let ciphertext: Ciphertext = env
        .storage()
        .persistent()
        .get(&DataKey::Cipher(handle.clone()))
        .ok_or(Error::UnknownHandle)?;
    if !allowed(env, handle, caller) {
        return Err(Error::NotAllowed);
    }
    if ciphertext.kind != kind {
        return Err(Error::TypeMismatch);
    }
    Ok(ciphertext.value)
}

fn u8_cipher(value: u32) -> Ciphertext {
    Ciphertext { kind: CipherKind::U8, value: value & 0xff }
}

// ============================================================================
// Contract
// ============================================================================

#[contract]
pub struct MockFheCoprocessor;

#[contractimpl]
impl MockFheCoprocessor {

    // ========================================================================
    // Client side: what a wallet SDK would do off-chain
    // ========================================================================

    /// Encrypt an 8-bit input for `user` to submit to `contract` in
    /// `session_id`. Values above 255 are truncated to their low byte.
    pub fn encrypt_input(
        env: Env,
        value: u32,
        contract: Address,
        user: Address,
        session_id: u32,
    ) -> EncryptedInput {
        let handle = fresh_handle(&env);
        let key = DataKey::Input(handle.clone());
        env.storage().persistent().set(&key, &u8_cipher(value));
        env.storage().persistent().extend_ttl(&key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);

        let proof = input_proof(&env, &handle, &contract, &user, session_id);
        EncryptedInput { handle, proof }
    }

    // ========================================================================
    // Input ingestion
    // ========================================================================

    /// Check that `proof` binds `input` to (caller, user, session_id) and
    /// admit it as a ciphertext usable by `caller`.
    pub fn verify_input(
        env: Env,
        caller: Address,
        input: BytesN<32>,
        proof: Bytes,
        user: Address,
        session_id: u32,
    ) -> Result<BytesN<32>, Error> {
        caller.require_auth();

        let ciphertext: Ciphertext = env
            .storage()
            .persistent()
            .get(&DataKey::Input(input.clone()))
            .ok_or(Error::UnknownHandle)?;

        if proof != input_proof(&env, &input, &caller, &user, session_id) {
            log!(&env, "verify_input: proof mismatch for session {}", session_id);
            return Err(Error::InvalidProof);
        }

        let key = DataKey::Cipher(input.clone());
        env.storage().persistent().set(&key, &ciphertext);
        env.storage().persistent().extend_ttl(&key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);
        grant(&env, &input, &caller);
        Ok(input)
    }

    // ========================================================================
    // Homomorphic operations
    // ========================================================================

    pub fn trivial_encrypt(env: Env, caller: Address, value: u32) -> BytesN<32> {
        caller.require_auth();
        store(&env, &caller, u8_cipher(value))
    }

    /// Wrapping 8-bit addition of a plaintext scalar.
    pub fn add_scalar(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: u32,
    ) -> Result<BytesN<32>, Error> {
        caller.require_auth();
        let a = operand(&env, &caller, &lhs, CipherKind::U8)?;
        Ok(store(&env, &caller, u8_cipher(a + (rhs & 0xff))))
    }

    pub fn rem_scalar(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        modulus: u32,
    ) -> Result<BytesN<32>, Error> {
        caller.require_auth();
        if modulus == 0 {
            return Err(Error::DivisionByZero);
        }
        let a = operand(&env, &caller, &lhs, CipherKind::U8)?;
        Ok(store(&env, &caller, u8_cipher(a % modulus)))
    }

    /// Encrypted equality; the result is an encrypted bool.
    pub fn eq(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: BytesN<32>,
    ) -> Result<BytesN<32>, Error> {
        caller.require_auth();
        let a = operand(&env, &caller, &lhs, CipherKind::U8)?;
        let b = operand(&env, &caller, &rhs, CipherKind::U8)?;
        let ciphertext = Ciphertext { kind: CipherKind::Bool, value: (a == b) as u32 };
        Ok(store(&env, &caller, ciphertext))
    }

    pub fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> Result<BytesN<32>, Error> {
        caller.require_auth();
        let c = operand(&env, &caller, &cond, CipherKind::Bool)?;
        let t = operand(&env, &caller, &if_true, CipherKind::U8)?;
        let f = operand(&env, &caller, &if_false, CipherKind::U8)?;
        Ok(store(&env, &caller, u8_cipher(if c != 0 { t } else { f })))
    }

    // ========================================================================
    // Access control
    // ========================================================================

    /// Let `account` decrypt `handle`. Only a holder of the handle may share it.
    pub fn allow(
        env: Env,
        caller: Address,
        handle: BytesN<32>,
        account: Address,
    ) -> Result<(), Error> {
        caller.require_auth();
        if !env.storage().persistent().has(&DataKey::Cipher(handle.clone())) {
            return Err(Error::UnknownHandle);
        }
        if !allowed(&env, &handle, &caller) {
            return Err(Error::NotAllowed);
        }
        grant(&env, &handle, &account);
        Ok(())
    }

    pub fn allow_public(env: Env, caller: Address, handle: BytesN<32>) -> Result<(), Error> {
        caller.require_auth();
        if !env.storage().persistent().has(&DataKey::Cipher(handle.clone())) {
            return Err(Error::UnknownHandle);
        }
        if !allowed(&env, &handle, &caller) {
            return Err(Error::NotAllowed);
        }
        let key = DataKey::Public(handle);
        env.storage().persistent().set(&key, &true);
        env.storage().persistent().extend_ttl(&key, HANDLE_TTL_LEDGERS, HANDLE_TTL_LEDGERS);
        Ok(())
    }

    pub fn is_allowed(env: Env, handle: BytesN<32>, account: Address) -> bool {
        allowed(&env, &handle, &account)
    }

    pub fn is_public(env: Env, handle: BytesN<32>) -> bool {
        env.storage().persistent().has(&DataKey::Public(handle))
    }

    // ========================================================================
    // Decryption
    // ========================================================================

    /// User decryption: `requester` signs, the ACL decides.
    pub fn decrypt(env: Env, handle: BytesN<32>, requester: Address) -> Result<u32, Error> {
        requester.require_auth();
        let ciphertext: Ciphertext = env
            .storage()
            .persistent()
            .get(&DataKey::Cipher(handle.clone()))
            .ok_or(Error::UnknownHandle)?;
        if !allowed(&env, &handle, &requester) {
            return Err(Error::NotAllowed);
        }
        Ok(ciphertext.value)
    }
}

//! Encrypted-value capability.
//!
//! The game rule is written against [`EncryptedU8`], a tiny algebra over
//! encrypted small integers. [`Coprocessor`] implements it by calling out to
//! the FHE coprocessor contract; tests swap in a plaintext implementation.

use soroban_sdk::xdr::{ScErrorCode, ScErrorType};
use soroban_sdk::{contractclient, panic_with_error, Address, Bytes, BytesN, Env, InvokeError};

use crate::Error;

/// Opaque ciphertext handle issued by the coprocessor.
pub type Handle = BytesN<32>;

// ============================================================================
// Coprocessor Client
// ============================================================================

#[contractclient(name = "FheCoprocessorClient")]
pub trait FheCoprocessor {
    fn verify_input(
        env: Env,
        caller: Address,
        input: BytesN<32>,
        proof: Bytes,
        user: Address,
        session_id: u32,
    ) -> BytesN<32>;
    fn trivial_encrypt(env: Env, caller: Address, value: u32) -> BytesN<32>;
    fn add_scalar(env: Env, caller: Address, lhs: BytesN<32>, rhs: u32) -> BytesN<32>;
    fn rem_scalar(env: Env, caller: Address, lhs: BytesN<32>, modulus: u32) -> BytesN<32>;
    fn eq(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;
    fn select(
        env: Env,
        caller: Address,
        cond: BytesN<32>,
        if_true: BytesN<32>,
        if_false: BytesN<32>,
    ) -> BytesN<32>;
    fn allow(env: Env, caller: Address, handle: BytesN<32>, account: Address);
    fn allow_public(env: Env, caller: Address, handle: BytesN<32>);
}

// ============================================================================
// Encrypted small-int algebra
// ============================================================================

/// Homomorphic operations over encrypted 8-bit values. Nothing here ever
/// yields a plaintext.
pub trait EncryptedU8 {
    type Value: Clone;
    type Bool;

    fn constant(&self, value: u8) -> Self::Value;
    fn add_scalar(&self, lhs: &Self::Value, rhs: u8) -> Self::Value;
    fn rem_scalar(&self, lhs: &Self::Value, modulus: u8) -> Self::Value;
    fn eq(&self, lhs: &Self::Value, rhs: &Self::Value) -> Self::Bool;
    fn select(
        &self,
        cond: &Self::Bool,
        if_true: &Self::Value,
        if_false: &Self::Value,
    ) -> Self::Value;
}

/// The coprocessor as seen from this contract. Every call names this
/// contract as the caller, so results land on its ACL.
pub struct Coprocessor<'a> {
    env: &'a Env,
    client: FheCoprocessorClient<'a>,
    this: Address,
}

impl<'a> Coprocessor<'a> {
    pub fn new(env: &'a Env, address: &Address) -> Self {
        Self {
            env,
            client: FheCoprocessorClient::new(env, address),
            this: env.current_contract_address(),
        }
    }

    /// Admit a client-encrypted input bound to (this contract, user, session).
    pub fn verify_input(
        &self,
        input: &Handle,
        proof: &Bytes,
        user: &Address,
        session_id: u32,
    ) -> Result<Handle, Error> {
        match self
            .client
            .try_verify_input(&self.this, input, proof, user, &session_id)
        {
            Ok(Ok(handle)) => Ok(handle),
            _ => Err(Error::InvalidProof),
        }
    }

    pub fn allow(&self, handle: &Handle, account: &Address) {
        self.settle(self.client.try_allow(&self.this, handle, account))
    }

    pub fn allow_public(&self, handle: &Handle) {
        self.settle(self.client.try_allow_public(&self.this, handle))
    }

    /// Past input verification, a failed coprocessor call traps the whole
    /// invocation. The callee's error codes never surface as ours.
    fn settle<T, C, E>(&self, result: Result<Result<T, C>, Result<E, InvokeError>>) -> T {
        match result {
            Ok(Ok(value)) => value,
            _ => panic_with_error!(
                self.env,
                soroban_sdk::Error::from_type_and_code(
                    ScErrorType::Context,
                    ScErrorCode::InternalError,
                )
            ),
        }
    }
}

impl EncryptedU8 for Coprocessor<'_> {
    type Value = Handle;
    type Bool = Handle;

    fn constant(&self, value: u8) -> Handle {
        self.settle(self.client.try_trivial_encrypt(&self.this, &(value as u32)))
    }

    fn add_scalar(&self, lhs: &Handle, rhs: u8) -> Handle {
        self.settle(self.client.try_add_scalar(&self.this, lhs, &(rhs as u32)))
    }

    fn rem_scalar(&self, lhs: &Handle, modulus: u8) -> Handle {
        self.settle(self.client.try_rem_scalar(&self.this, lhs, &(modulus as u32)))
    }

    fn eq(&self, lhs: &Handle, rhs: &Handle) -> Handle {
        self.settle(self.client.try_eq(&self.this, lhs, rhs))
    }

    fn select(&self, cond: &Handle, if_true: &Handle, if_false: &Handle) -> Handle {
        self.settle(self.client.try_select(&self.this, cond, if_true, if_false))
    }
}

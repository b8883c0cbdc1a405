//! Decryption policy for a session's encrypted fields.
//!
//! | field   | decryptable by |
//! |---------|----------------|
//! | move1   | player1        |
//! | move2   | player2        |
//! | outcome | everyone       |
//!
//! Each grant is recorded on the session and pushed to the coprocessor in
//! the same invocation that writes the field. Grants are never revoked.

use soroban_sdk::{contracttype, Address, Vec};

use crate::fhe::Coprocessor;
use crate::{Error, Session};

#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Field {
    Move1   = 0,
    Move2   = 1,
    Outcome = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Grantee {
    Account(Address),
    Public,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Grant {
    pub field:   Field,
    pub grantee: Grantee,
}

/// Who the policy table says may decrypt `field`. `None` while the owning
/// player is not yet known.
pub fn grantee_for(session: &Session, field: Field) -> Option<Grantee> {
    match field {
        Field::Move1   => Some(Grantee::Account(session.player1.clone())),
        Field::Move2   => session.player2.clone().map(Grantee::Account),
        Field::Outcome => Some(Grantee::Public),
    }
}

/// Open `field` to its policy grantee. The field must already hold a handle.
pub(crate) fn open(fhe: &Coprocessor, session: &mut Session, field: Field) -> Result<(), Error> {
    let handle = session.handle(field).ok_or(Error::InvalidState)?;
    let grantee = grantee_for(session, field).ok_or(Error::InvalidState)?;

    match &grantee {
        Grantee::Account(account) => fhe.allow(&handle, account),
        Grantee::Public => fhe.allow_public(&handle),
    }
    session.grants.push_back(Grant { field, grantee });
    Ok(())
}

pub fn is_granted(grants: &Vec<Grant>, field: Field, account: &Address) -> bool {
    grants.iter().any(|grant| {
        grant.field == field
            && match grant.grantee {
                Grantee::Public => true,
                Grantee::Account(ref grantee) => grantee == account,
            }
    })
}

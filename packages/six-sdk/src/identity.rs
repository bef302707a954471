use std::fmt::{Debug, Display};

use bitcoin::hashes::{ripemd160, sha256, Hash};
use bitcoin::secp256k1::ecdsa::Signature;
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use once_cell::sync::OnceCell;
use uuid::Uuid;

use crate::address::{Address, Bech32Prefixes, HasAddress};
use crate::error::ImportError;

/// The single signing identity of a [crate::Client].
///
/// Holds the decrypted secp256k1 key in memory only. Each import gets a fresh
/// alias, so two identities never collide even when built from the same key.
#[derive(Clone)]
pub struct Identity {
    alias: String,
    address: Address,
    privkey: SecretKey,
    public_key_bytes: [u8; 33],
}

fn global_secp() -> &'static Secp256k1<All> {
    static CELL: OnceCell<Secp256k1<All>> = OnceCell::new();
    CELL.get_or_init(Secp256k1::new)
}

impl Identity {
    /// Decrypt an armored private key and derive its account address.
    pub fn import_armor(
        armor: &str,
        passphrase: &str,
        prefixes: &Bech32Prefixes,
    ) -> Result<Self, ImportError> {
        let privkey = crate::armor::decrypt_armor(armor, passphrase)?;
        Ok(Self::from_secret_key(privkey, prefixes))
    }

    /// Build an identity from raw secret key bytes.
    pub fn from_secret_bytes(
        secret: &[u8],
        prefixes: &Bech32Prefixes,
    ) -> Result<Self, ImportError> {
        let privkey = SecretKey::from_slice(secret)
            .map_err(|source| ImportError::InvalidSecretKey { source })?;
        Ok(Self::from_secret_key(privkey, prefixes))
    }

    pub fn from_secret_key(privkey: SecretKey, prefixes: &Bech32Prefixes) -> Self {
        let public_key_bytes = PublicKey::from_secret_key(global_secp(), &privkey).serialize();
        let address = prefixes.account_address(address_from_public_key(&public_key_bytes));
        Identity {
            alias: Uuid::new_v4().to_string(),
            address,
            privkey,
            public_key_bytes,
        }
    }

    /// Generate a random identity, mostly useful for testing.
    pub fn generate(prefixes: &Bech32Prefixes) -> Self {
        loop {
            let bytes: [u8; 32] = rand::random();
            // Out of range values are astronomically rare, just try again
            if let Ok(privkey) = SecretKey::from_slice(&bytes) {
                break Self::from_secret_key(privkey, prefixes);
            }
        }
    }

    /// Export the key in the armor format accepted by [Identity::import_armor].
    pub fn export_armor(&self, passphrase: &str) -> Result<String, ImportError> {
        crate::armor::encrypt_armor(&self.privkey, passphrase)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Internally generated name of the imported key.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Compressed secp256k1 public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    /// sha256 the bytes and sign them with ECDSA.
    pub fn sign_bytes(&self, msg: &[u8]) -> Result<Signature, bitcoin::secp256k1::Error> {
        let msg = sha256::Hash::hash(msg);
        let msg = Message::from_slice(msg.as_ref())?;
        Ok(global_secp().sign_ecdsa(&msg, &self.privkey))
    }
}

pub(crate) fn address_from_public_key(public_key: &[u8]) -> [u8; 20] {
    let sha = sha256::Hash::hash(public_key);
    ripemd160::Hash::hash(sha.as_ref()).into_inner()
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("alias", &self.alias)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl HasAddress for Identity {
    fn get_address(&self) -> Address {
        self.address.clone()
    }
}

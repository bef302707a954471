use std::{
    convert::TryFrom,
    fmt::{Debug, Display},
    str::FromStr,
    sync::Arc,
};

use bech32::{FromBase32, ToBase32};
use serde::de::Visitor;

use crate::error::AddressError;

/// Base prefix for every address type on the SIX chain.
pub const SIX_ADDRESS_PREFIX: &str = "6x";

/// The human-readable part (HRP) of a bech32 address, such as `6x` or `6xvaloper`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AddressHrp(Arc<str>);

impl AddressHrp {
    /// Validate and wrap an HRP.
    ///
    /// HRPs must be 1 to 83 lowercase printable ASCII characters.
    pub fn new(hrp: impl Into<String>) -> Result<Self, AddressError> {
        let hrp = hrp.into();
        let valid = !hrp.is_empty()
            && hrp.len() <= 83
            && hrp
                .bytes()
                .all(|b| (33..=126).contains(&b) && !b.is_ascii_uppercase());
        if valid {
            Ok(AddressHrp(hrp.into()))
        } else {
            Err(AddressError::InvalidHrp { hrp })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AddressHrp {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AddressHrp::new(s)
    }
}

impl Display for AddressHrp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for AddressHrp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// A raw address value not connected to a specific HRP. You usually want [Address].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum RawAddress {
    Twenty { raw_address: [u8; 20] },
    ThirtyTwo { raw_address: [u8; 32] },
}

/// Parse a raw address and its HRP from a string. Supports any Cosmos-compatible blockchain.
pub fn parse_raw_address(s: &str) -> Result<(AddressHrp, RawAddress), AddressError> {
    let (hrp, data, variant) =
        bech32::decode(s).map_err(|source| AddressError::InvalidBech32 {
            address: s.to_owned(),
            source,
        })?;
    match variant {
        bech32::Variant::Bech32 => (),
        bech32::Variant::Bech32m => {
            return Err(AddressError::Bech32mUnsupported {
                address: s.to_owned(),
            })
        }
    }
    let data =
        Vec::<u8>::from_base32(&data).map_err(|source| AddressError::InvalidBech32 {
            address: s.to_owned(),
            source,
        })?;
    let raw_address = RawAddress::try_from(data.as_slice())?;
    Ok((AddressHrp::new(hrp)?, raw_address))
}

/// Note that using this instance throws away the Human Readable Part (HRP) of the address!
impl FromStr for RawAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_raw_address(s).map(|x| x.1)
    }
}

impl AsRef<[u8]> for RawAddress {
    fn as_ref(&self) -> &[u8] {
        match self {
            RawAddress::Twenty { raw_address } => raw_address,
            RawAddress::ThirtyTwo { raw_address } => raw_address,
        }
    }
}

impl From<[u8; 20]> for RawAddress {
    fn from(raw_address: [u8; 20]) -> Self {
        RawAddress::Twenty { raw_address }
    }
}

impl From<[u8; 32]> for RawAddress {
    fn from(raw_address: [u8; 32]) -> Self {
        RawAddress::ThirtyTwo { raw_address }
    }
}

impl TryFrom<&[u8]> for RawAddress {
    type Error = AddressError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value.try_into().ok() {
            Some(raw_address) => Ok(RawAddress::Twenty { raw_address }),
            None => value
                .try_into()
                .map(|raw_address| RawAddress::ThirtyTwo { raw_address })
                .map_err(|_| AddressError::InvalidByteCount { actual: value.len() }),
        }
    }
}

impl RawAddress {
    pub fn with_hrp(self, hrp: AddressHrp) -> Address {
        Address {
            raw_address: self,
            hrp,
        }
    }
}

/// An address on a Cosmos blockchain
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    raw_address: RawAddress,
    hrp: AddressHrp,
}

impl Address {
    pub fn raw(&self) -> &RawAddress {
        &self.raw_address
    }

    pub fn hrp(&self) -> &AddressHrp {
        &self.hrp
    }

    /// The same raw bytes under a different HRP.
    pub fn for_hrp(&self, hrp: AddressHrp) -> Self {
        Address {
            raw_address: self.raw_address,
            hrp,
        }
    }
}

impl Display for Address {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        AddressAnyHrp {
            raw_address: self.raw_address,
            hrp: self.hrp.as_str(),
        }
        .fmt(fmt)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{self}\"")
    }
}

pub struct AddressAnyHrp<'a> {
    pub raw_address: RawAddress,
    pub hrp: &'a str,
}

impl<'a> Display for AddressAnyHrp<'a> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        bech32::encode_to_fmt(
            fmt,
            self.hrp,
            self.raw_address.to_base32(),
            bech32::Variant::Bech32,
        )
        .expect("Invalid HRP")
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl From<&Address> for String {
    fn from(address: &Address) -> Self {
        address.to_string()
    }
}

/// Accepts any HRP. Use [Bech32Prefixes::parse_account_address] to pin the prefix.
impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hrp, raw_address) = parse_raw_address(s)?;
        Ok(Address { raw_address, hrp })
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AddressVisitor)
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("Cosmos address")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

pub trait HasAddress {
    fn get_address(&self) -> Address;

    fn get_address_string(&self) -> String {
        self.get_address().to_string()
    }
}

impl HasAddress for Address {
    fn get_address(&self) -> Address {
        self.clone()
    }
}

impl<T: HasAddress> HasAddress for &T {
    fn get_address(&self) -> Address {
        HasAddress::get_address(*self)
    }
}

/// The full set of bech32 prefixes used by one chain.
///
/// Passed explicitly to address derivation and message validation, so clients
/// configured for different chains can live side by side in one process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bech32Prefixes {
    account: AddressHrp,
    account_pub: AddressHrp,
    validator: AddressHrp,
    validator_pub: AddressHrp,
    consensus: AddressHrp,
    consensus_pub: AddressHrp,
}

impl Bech32Prefixes {
    /// Derive all prefixes from the account prefix, following the Cosmos SDK convention.
    pub fn from_base(base: &str) -> Result<Self, AddressError> {
        let make = |suffix: &str| AddressHrp::new(format!("{base}{suffix}"));
        Ok(Bech32Prefixes {
            account: make("")?,
            account_pub: make("pub")?,
            validator: make("valoper")?,
            validator_pub: make("valoperpub")?,
            consensus: make("valcons")?,
            consensus_pub: make("valconspub")?,
        })
    }

    /// Prefixes of the SIX chain (`6x`, `6xpub`, `6xvaloper`, ...).
    pub fn six() -> Self {
        Self::from_base(SIX_ADDRESS_PREFIX).expect("6x is a valid HRP")
    }

    pub fn account(&self) -> &AddressHrp {
        &self.account
    }

    pub fn account_pub(&self) -> &AddressHrp {
        &self.account_pub
    }

    pub fn validator(&self) -> &AddressHrp {
        &self.validator
    }

    pub fn validator_pub(&self) -> &AddressHrp {
        &self.validator_pub
    }

    pub fn consensus(&self) -> &AddressHrp {
        &self.consensus
    }

    pub fn consensus_pub(&self) -> &AddressHrp {
        &self.consensus_pub
    }

    pub fn account_address(&self, raw: impl Into<RawAddress>) -> Address {
        raw.into().with_hrp(self.account.clone())
    }

    pub fn validator_address(&self, raw: impl Into<RawAddress>) -> Address {
        raw.into().with_hrp(self.validator.clone())
    }

    /// Parse an account address, failing if its HRP is not this chain's account prefix.
    pub fn parse_account_address(&self, s: &str) -> Result<Address, AddressError> {
        let address: Address = s.parse()?;
        if address.hrp == self.account {
            Ok(address)
        } else {
            Err(AddressError::WrongHrp {
                address: s.to_owned(),
                expected: self.account.clone(),
                actual: address.hrp,
            })
        }
    }
}

impl Default for Bech32Prefixes {
    fn default() -> Self {
        Self::six()
    }
}

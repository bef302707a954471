//! Static gas prices such as `1.25usix`, and the fees they imply.

use std::{fmt::Display, str::FromStr};

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;

use crate::error::GasPriceError;

/// Gas price used when none is configured.
pub const DEFAULT_GAS_PRICES: &str = "1.25usix";

const MAX_DECIMALS: u32 = 18;

/// Price per unit of gas in a single denom.
///
/// Stored as an integer number of atomics with a decimal scale, so fee
/// computation never goes through floating point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasPrice {
    atomics: u128,
    decimals: u32,
    denom: String,
}

impl GasPrice {
    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// Fee for the given gas limit, rounded up like the Cosmos SDK does.
    pub fn fee_for(&self, gas_limit: u64) -> u128 {
        let scale = 10u128.pow(self.decimals);
        let total = u128::from(gas_limit).saturating_mul(self.atomics);
        total / scale + u128::from(total % scale != 0)
    }
}

impl FromStr for GasPrice {
    type Err = GasPriceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || GasPriceError::Malformed {
            input: input.to_owned(),
        };
        let s = input.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(malformed)?;
        let (amount, denom) = s.split_at(split);
        let denom = denom.trim_start();
        if !is_valid_denom(denom) {
            return Err(malformed());
        }

        let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(malformed());
        }
        let fraction = fraction.trim_end_matches('0');
        let decimals = u32::try_from(fraction.len()).map_err(|_| malformed())?;
        if decimals > MAX_DECIMALS {
            return Err(GasPriceError::TooPrecise {
                input: input.to_owned(),
            });
        }
        let atomics = format!("{whole}{fraction}");
        let atomics = if atomics.is_empty() {
            0
        } else {
            atomics.parse().map_err(|_| malformed())?
        };

        Ok(GasPrice {
            atomics,
            decimals,
            denom: denom.to_owned(),
        })
    }
}

impl Display for GasPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let scale = 10u128.pow(self.decimals);
        let whole = self.atomics / scale;
        let fraction = self.atomics % scale;
        if self.decimals == 0 {
            write!(f, "{whole}{}", self.denom)
        } else {
            write!(
                f,
                "{whole}.{fraction:0width$}{}",
                self.denom,
                width = self.decimals as usize
            )
        }
    }
}

/// Cosmos SDK denom rule: a letter followed by 2 to 127 of `[a-zA-Z0-9/:._-]`.
pub(crate) fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && (3..=128).contains(&denom.len())
        && chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c))
}

/// One or more gas prices, e.g. `1.25usix` or `1.25usix,0.1uatom`. Sorted by denom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasPrices(Vec<GasPrice>);

impl GasPrices {
    pub fn iter(&self) -> impl Iterator<Item = &GasPrice> {
        self.0.iter()
    }

    /// Fee coins for a gas limit. Zero amounts are left out.
    pub fn fees_for(&self, gas_limit: u64) -> Vec<Coin> {
        self.0
            .iter()
            .map(|price| (price, price.fee_for(gas_limit)))
            .filter(|(_, amount)| *amount > 0)
            .map(|(price, amount)| Coin {
                denom: price.denom.clone(),
                amount: amount.to_string(),
            })
            .collect()
    }
}

impl Default for GasPrices {
    fn default() -> Self {
        DEFAULT_GAS_PRICES
            .parse()
            .expect("default gas price is valid")
    }
}

impl FromStr for GasPrices {
    type Err = GasPriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut prices = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(GasPrice::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if prices.is_empty() {
            return Err(GasPriceError::Empty);
        }
        prices.sort_by(|a, b| a.denom.cmp(&b.denom));
        if let Some(pair) = prices.windows(2).find(|pair| pair[0].denom == pair[1].denom) {
            return Err(GasPriceError::DuplicateDenom {
                denom: pair[0].denom.clone(),
            });
        }
        Ok(GasPrices(prices))
    }
}

impl Display for GasPrices {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (idx, price) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{price}")?;
        }
        Ok(())
    }
}

impl serde::Serialize for GasPrices {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for GasPrices {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

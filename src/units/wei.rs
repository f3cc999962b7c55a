use std::{
    fmt::Display,
    num::ParseIntError,
    ops::Neg,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::WEI_PER_ETH;

/// An amount in the smallest on-chain unit. Serialized as a decimal string so that amounts
/// well beyond 2^53 survive a round trip through JSON.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct WeiNewtype(pub i128);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseWeiError {
    #[error("failed to parse wei amount: {0}")]
    InvalidNumber(#[from] ParseIntError),
    #[error("invalid native token amount {0:?}")]
    InvalidAmount(String),
    #[error("native token amount {0:?} has more than 18 fractional digits")]
    TooManyDecimals(String),
    #[error("native token amount {0:?} does not fit in wei")]
    Overflow(String),
}

impl WeiNewtype {
    pub const ZERO: WeiNewtype = WeiNewtype(0);

    pub fn from_eth(eth: i128) -> Self {
        Self(eth * WEI_PER_ETH)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses a decimal native token amount like `545` or `0.25` into wei without going through
    /// floating point.
    pub fn parse_eth_str(text: &str) -> Result<Self, ParseWeiError> {
        let text = text.trim();
        let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));

        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction)
        {
            return Err(ParseWeiError::InvalidAmount(text.to_string()));
        }

        if fraction.len() > 18 {
            return Err(ParseWeiError::TooManyDecimals(text.to_string()));
        }

        let whole = if whole.is_empty() {
            0
        } else {
            whole.parse::<i128>()?
        };
        let fraction = if fraction.is_empty() {
            0
        } else {
            format!("{fraction:0<18}").parse::<i128>()?
        };

        whole
            .checked_mul(WEI_PER_ETH)
            .and_then(|wei| wei.checked_add(fraction))
            .map(WeiNewtype)
            .ok_or_else(|| ParseWeiError::Overflow(text.to_string()))
    }

    /// Formats the amount in whole native tokens, e.g. `1500000000000000000` as `1.5`.
    pub fn format_eth(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let amount = self.0.unsigned_abs();
        let wei_per_eth = WEI_PER_ETH as u128;
        let whole = amount / wei_per_eth;
        let fraction = amount % wei_per_eth;

        if fraction == 0 {
            format!("{sign}{whole}")
        } else {
            let fraction = format!("{fraction:018}");
            format!("{sign}{whole}.{}", fraction.trim_end_matches('0'))
        }
    }
}

impl Neg for WeiNewtype {
    type Output = Self;

    fn neg(self) -> Self::Output {
        WeiNewtype(-self.0)
    }
}

impl Display for WeiNewtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let WeiNewtype(amount) = self;
        write!(f, "{amount}")
    }
}

impl From<WeiNewtype> for String {
    fn from(WeiNewtype(amount): WeiNewtype) -> Self {
        amount.to_string()
    }
}

impl FromStr for WeiNewtype {
    type Err = ParseWeiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.trim().parse::<i128>().map(WeiNewtype)?)
    }
}

impl TryFrom<String> for WeiNewtype {
    type Error = ParseWeiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_string_test() {
        let wei = WeiNewtype(1_000_000_000_000_000_000);
        assert_eq!(
            serde_json::to_string(&wei).unwrap(),
            r#""1000000000000000000""#
        );
    }

    #[test]
    fn deserializes_beyond_f64_precision_test() {
        let wei: WeiNewtype = serde_json::from_str(r#""118908973575220938641041929""#).unwrap();
        assert_eq!(wei, WeiNewtype(118908973575220938641041929));
    }

    #[test]
    fn rejects_non_numeric_test() {
        assert!(serde_json::from_str::<WeiNewtype>(r#""12abc""#).is_err());
        assert!("".parse::<WeiNewtype>().is_err());
    }

    #[test]
    fn parse_eth_str_whole_test() {
        assert_eq!(
            WeiNewtype::parse_eth_str("545").unwrap(),
            WeiNewtype::from_eth(545)
        );
        assert_eq!(
            WeiNewtype::parse_eth_str("545.0").unwrap(),
            WeiNewtype::from_eth(545)
        );
    }

    #[test]
    fn parse_eth_str_fraction_test() {
        assert_eq!(
            WeiNewtype::parse_eth_str("0.25").unwrap(),
            WeiNewtype(250_000_000_000_000_000)
        );
        assert_eq!(
            WeiNewtype::parse_eth_str(".000000000000000001").unwrap(),
            WeiNewtype(1)
        );
    }

    #[test]
    fn parse_eth_str_invalid_test() {
        assert_eq!(
            WeiNewtype::parse_eth_str("-1"),
            Err(ParseWeiError::InvalidAmount("-1".to_string()))
        );
        assert_eq!(
            WeiNewtype::parse_eth_str("0.0000000000000000001"),
            Err(ParseWeiError::TooManyDecimals(
                "0.0000000000000000001".to_string()
            ))
        );
        assert!(WeiNewtype::parse_eth_str(".").is_err());
    }

    #[test]
    fn format_eth_test() {
        assert_eq!(WeiNewtype::from_eth(545).format_eth(), "545");
        assert_eq!(WeiNewtype(1_500_000_000_000_000_000).format_eth(), "1.5");
        assert_eq!(WeiNewtype(1).format_eth(), "0.000000000000000001");
        assert_eq!(WeiNewtype(-250_000_000_000_000_000).format_eth(), "-0.25");
    }

    #[test]
    fn neg_test() {
        let wei = WeiNewtype(10);
        assert_eq!(-wei, WeiNewtype(-10));
        assert!((-wei).is_negative());
        assert_eq!(-(-wei), wei);
    }
}

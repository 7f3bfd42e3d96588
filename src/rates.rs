//! Mock currency-conversion table.
//!
//! Stand-in for a real rate oracle: fixed MXN rates per supported token.
//! The coordinator takes the table by value so a pluggable source can be
//! swapped in without touching the pipeline.

use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Decimal places carried by token amounts (XRPL drop precision).
pub const TOKEN_SCALE: u32 = 6;
/// Decimal places carried by fiat (MXN) amounts.
pub const FIAT_SCALE: u32 = 2;

#[derive(Error, Debug, PartialEq)]
pub enum RateError {
    #[error("Unsupported token: {0}")]
    UnsupportedToken(String),
}

/// MXN exchange rates keyed by token code.
#[derive(Debug, Clone)]
pub struct RateTable {
    mxn_per_token: HashMap<String, Decimal>,
}

impl RateTable {
    /// The fixed testnet rates: 1 XRP = 20 MXN, 1 USDC = 17.5 MXN,
    /// 1 RLUSD = 17.5 MXN, MXN 1:1.
    pub fn mock() -> Self {
        let mut mxn_per_token = HashMap::new();
        mxn_per_token.insert("XRP".to_string(), Decimal::new(200, 1));
        mxn_per_token.insert("USDC".to_string(), Decimal::new(175, 1));
        mxn_per_token.insert("RLUSD".to_string(), Decimal::new(175, 1));
        mxn_per_token.insert("MXN".to_string(), Decimal::ONE);
        Self { mxn_per_token }
    }

    pub fn supported_tokens(&self) -> Vec<&str> {
        self.mxn_per_token.keys().map(|k| k.as_str()).collect()
    }

    fn rate(&self, token: &str) -> Result<Decimal, RateError> {
        self.mxn_per_token
            .get(token)
            .copied()
            .ok_or_else(|| RateError::UnsupportedToken(token.to_string()))
    }

    /// Converts an MXN amount into the given token, at 6 decimal places.
    pub fn mxn_to_token(&self, amount_mxn: Decimal, token: &str) -> Result<Decimal, RateError> {
        let rate = self.rate(token)?;
        Ok((amount_mxn / rate).round_dp(TOKEN_SCALE))
    }

    /// Converts a token amount back into MXN, at 2 decimal places.
    pub fn token_to_mxn(&self, amount_token: Decimal, token: &str) -> Result<Decimal, RateError> {
        let rate = self.rate(token)?;
        Ok((amount_token * rate).round_dp(FIAT_SCALE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_mxn_to_xrp() {
        let rates = RateTable::mock();
        let amount = rates
            .mxn_to_token(Decimal::from_str("500.00").unwrap(), "XRP")
            .unwrap();
        assert_eq!(amount, Decimal::from_str("25.000000").unwrap());
    }

    #[test]
    fn test_mxn_to_usdc_six_decimals() {
        let rates = RateTable::mock();
        let amount = rates
            .mxn_to_token(Decimal::from_str("500.00").unwrap(), "USDC")
            .unwrap();
        assert_eq!(amount, Decimal::from_str("28.571429").unwrap());
    }

    #[test]
    fn test_token_to_mxn_round_trip() {
        let rates = RateTable::mock();
        let mxn = rates
            .token_to_mxn(Decimal::from_str("25.000000").unwrap(), "XRP")
            .unwrap();
        assert_eq!(mxn, Decimal::from_str("500.00").unwrap());
    }

    #[test]
    fn test_mxn_identity() {
        let rates = RateTable::mock();
        let amount = rates
            .mxn_to_token(Decimal::from_str("123.45").unwrap(), "MXN")
            .unwrap();
        assert_eq!(amount, Decimal::from_str("123.450000").unwrap());
    }

    #[test]
    fn test_unsupported_token() {
        let rates = RateTable::mock();
        let err = rates
            .mxn_to_token(Decimal::ONE_HUNDRED, "DOGE")
            .unwrap_err();
        assert_eq!(err, RateError::UnsupportedToken("DOGE".to_string()));
    }
}

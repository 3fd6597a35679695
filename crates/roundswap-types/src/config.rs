//! Configuration types for a Roundswap engine and its two assets.

use serde::{Deserialize, Serialize};

use crate::{ParticipantId, Result, RoundswapError, constants};

/// Configuration for a single settlement engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The engine's own custody account on both asset ledgers.
    pub custody: ParticipantId,
    /// The first pooled asset.
    pub asset0: AssetConfig,
    /// The second pooled asset.
    pub asset1: AssetConfig,
}

impl EngineConfig {
    /// Default config with a fresh custody account and two 18-decimal assets.
    #[must_use]
    pub fn new(custody: ParticipantId) -> Self {
        Self {
            custody,
            asset0: AssetConfig::new(constants::DEFAULT_ASSET0_SYMBOL),
            asset1: AssetConfig::new(constants::DEFAULT_ASSET1_SYMBOL),
        }
    }

    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that both assets are usable and distinguishable.
    ///
    /// # Errors
    /// `Configuration` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.asset0.validate()?;
        self.asset1.validate()?;
        if self.asset0.symbol == self.asset1.symbol {
            return Err(RoundswapError::Configuration(format!(
                "asset0 and asset1 share the symbol {}",
                self.asset0.symbol
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(ParticipantId::new())
    }
}

/// Per-asset configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Ticker (e.g., "PUNK").
    pub symbol: String,
    /// Number of fractional digits of one whole unit.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_decimals() -> u32 {
    constants::DEFAULT_DECIMALS
}

impl AssetConfig {
    /// An asset with the default 18 decimals.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            decimals: constants::DEFAULT_DECIMALS,
        }
    }

    /// # Errors
    /// `Configuration` if the symbol is blank or `decimals` is too large.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(RoundswapError::Configuration(
                "asset symbol must not be empty".into(),
            ));
        }
        if self.decimals > constants::MAX_DECIMALS {
            return Err(RoundswapError::Configuration(format!(
                "{}: {} decimals exceeds the maximum of {}",
                self.symbol,
                self.decimals,
                constants::MAX_DECIMALS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.asset0.decimals, 18);
        assert_eq!(cfg.asset1.symbol, "ASSET1");
    }

    #[test]
    fn from_json_fills_default_decimals() {
        let json = r#"{
            "custody": "01890a5d-ac96-774b-bcce-b302099a8057",
            "asset0": { "symbol": "PUNK" },
            "asset1": { "symbol": "MORNI", "decimals": 6 }
        }"#;
        let cfg = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.asset0, AssetConfig::new("PUNK"));
        assert_eq!(cfg.asset1.decimals, 6);
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.asset1.symbol = cfg.asset0.symbol.clone();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, RoundswapError::Configuration(_)));
    }

    #[test]
    fn excessive_decimals_rejected() {
        let mut asset = AssetConfig::new("X");
        asset.decimals = 29;
        assert!(asset.validate().is_err());
        asset.symbol = "  ".into();
        asset.decimals = 18;
        assert!(asset.validate().is_err());
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, RoundswapError::Serialization(_)));
    }
}

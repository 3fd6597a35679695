//! System-wide constants for the Roundswap settlement engine.

/// Decimal places of the default fixed-point assets (ERC-20 style).
pub const DEFAULT_DECIMALS: u32 = 18;

/// Highest decimal precision an asset may declare (the `Decimal` scale limit).
pub const MAX_DECIMALS: u32 = 28;

/// Default symbol of the first pooled asset.
pub const DEFAULT_ASSET0_SYMBOL: &str = "ASSET0";

/// Default symbol of the second pooled asset.
pub const DEFAULT_ASSET1_SYMBOL: &str = "ASSET1";

/// Domain separator for round closure digests.
pub const ROUND_DIGEST_DOMAIN: &[u8] = b"roundswap:round_closure:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Roundswap";

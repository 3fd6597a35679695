//! # roundswap-ledger
//!
//! **Custody plane**: the asset ledger capability and an in-memory
//! implementation of it.
//!
//! ## Architecture
//!
//! The settlement engine moves value only through [`AssetLedger`]:
//! 1. **`transfer_in`**: pulls a deposit from a participant into custody
//! 2. **`transfer_out`**: pays a claim from custody to a participant
//! 3. **`balance_of`**: reports holdings, including the custody account's
//!
//! [`InMemoryLedger`] gives the capability ERC-20 semantics: a holder must
//! both own the funds and have approved custody before a deposit is pulled.

pub mod capability;
pub mod in_memory;

pub use capability::AssetLedger;
pub use in_memory::InMemoryLedger;

//! Bitcoin transaction assembly and broadcast.
//!
//! The [`assembler`] turns user-supplied UTXOs into an unsigned
//! transaction, signs it per input with immediate verification, and
//! reports virtual size for fee-rate display. The [`provider`] resolves
//! a broadcast target name or URL and POSTs the raw transaction.
//! Transactions progress strictly Unsigned → Signed → Broadcast.

pub mod assembler;
pub mod provider;

pub use assembler::{calc_vsize, create_transaction, sign, Utxo};
pub use provider::Provider;

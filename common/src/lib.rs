//! BankLedger Common Types
//!
//! Types shared by the ledger engine, the RPC surface and the client library:
//! account identifiers, wire amount conversion and the error taxonomy.

pub mod identifiers;
pub mod monetary;
pub mod error;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;

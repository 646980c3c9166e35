//! Member-balance transactions: yearly share decisions and savings deposits.

pub mod savings;
pub mod shares;

pub use savings::deposit_savings;
pub use shares::ShareEngine;

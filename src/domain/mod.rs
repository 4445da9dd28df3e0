mod customer;
mod ledger;
mod money;
mod statement;
mod transaction;

pub use customer::*;
pub use ledger::*;
pub use money::*;
pub use statement::*;
pub use transaction::*;

pub mod ledger;
pub mod record;
pub mod storage;

pub use ledger::{LedgerError, MetadataLedger};
pub use record::MetadataRecord;

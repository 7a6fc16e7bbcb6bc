pub mod filter;
pub mod live;

pub use filter::{Filter, Filterable};
pub use live::{decode_record, RawRecord, ANNOUNCE_RECORD_TYPE, WITHDRAW_RECORD_TYPE};

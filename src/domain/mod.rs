pub mod trade_query;
pub mod trade_table;

pub use trade_query::*;
pub use trade_table::*;

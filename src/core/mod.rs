pub mod intset;
pub mod ledger;
pub mod terms;
pub mod types;

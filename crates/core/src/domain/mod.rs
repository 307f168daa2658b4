pub mod alert;
pub mod asset;
pub mod catalog;
pub mod contract;
pub mod history;
pub mod invoice;
pub mod tier;

pub mod creation;
pub mod gordon;
pub mod modification;
pub mod network;
pub mod query;

//! One module per command group. Each handler posts its own success notice;
//! failures are turned into notices by the caller.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod custom_orders;
pub mod orders;

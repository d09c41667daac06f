//! Nextcart
//!
//! Nextcart is the storefront core for the `NextSite` web-design agency: plan catalog, persisted shopping cart, tax-inclusive pricing, discount codes and checkout orchestration.

pub mod cart;
pub mod checkout;
pub mod config;
pub mod discounts;
pub mod items;
pub mod mail;
pub mod payments;
pub mod plans;
pub mod popup;
pub mod prelude;
pub mod pricing;
pub mod receipt;
pub mod storage;

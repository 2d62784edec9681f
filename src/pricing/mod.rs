// Price discovery: per-window sampling and the maker-price decision rule.
pub mod oracle;
pub mod strategy;

pub use oracle::window_average;
pub use strategy::{decide_price, PriceDecision};

//! Price calculation for auction lots.
//!
//! This module turns a scraped winning bid and a [`crate::PriceConfiguration`]
//! into a [`crate::PriceBreakdown`].

pub mod bid_text;
pub mod common;
pub mod engine;

pub use bid_text::parse_bid_text;
pub use engine::PriceEngine;

pub mod expiry;
pub mod price_feed;

pub use expiry::{run_expiry_sweeper, sweep_once};
pub use price_feed::PriceFeed;

pub mod client;
pub mod error;
pub mod parse;
mod retry;
pub mod types;

pub use client::FeedClient;
pub use error::FeedError;
pub use parse::parse_offer;
pub use types::{FeedBatch, FeedFailure, MalformedOffer, SupplierFeed};

pub mod cache;
pub mod web;

pub use cache::TtlCache;
pub use web::{Augmentor, HttpWebClient, SearchResult, WebClient};

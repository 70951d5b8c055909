// src/news/mod.rs
pub mod cryptopanic;
pub mod types;

pub use cryptopanic::CryptoPanicSource;
pub use types::{NewsItem, NewsSource};

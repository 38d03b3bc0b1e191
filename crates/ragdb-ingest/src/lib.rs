#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod embed;
pub mod loader;

pub use embed::{default_provider, embed_all, HashEmbedder};
pub use loader::{IngestionItem, IngestionLoader};

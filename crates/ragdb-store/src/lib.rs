//! Vector-store adapters and the registry that hands out shared instances.
//!
//! Three backend families are wired in: LanceDB (vector, full-text and
//! hybrid), Tantivy (full-text only) and an in-memory brute-force store
//! (vector only, for tests and development). All of them speak the same
//! `VectorStoreAdapter` trait and normalize hits to `SearchHit`.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod lance;
pub mod memory;
pub mod registry;
pub mod schema;
pub mod text;

pub use lance::LanceAdapter;
pub use memory::MemoryAdapter;
pub use registry::{AdapterFactory, AdapterRegistry, BackendAdapterFactory};
pub use text::TantivyAdapter;

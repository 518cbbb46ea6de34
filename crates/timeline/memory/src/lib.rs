pub mod store;

pub use store::MemoryTimelineBackend;

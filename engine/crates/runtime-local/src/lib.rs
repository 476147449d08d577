mod evaluate;
mod store;

pub use store::InMemoryStore;

pub mod error;
pub mod predicate;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use predicate::{CompareOp, Predicate, TermMatch};
pub use store::{Entity, NewEntity, Ordering, Selection, Store, StoreInner, StoredValue, Transaction, Uid};

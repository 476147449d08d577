use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use crate::{Predicate, StoreResult};

/// Storage identifier of an entity, rendered as `0x..` like the storage engine does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Uid(pub u64);

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for Uid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16).map(Uid),
            None => s.parse().map(Uid),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum StoredValue {
    Scalar(serde_json::Value),
    Edges(Vec<Uid>),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Entity {
    pub uid: Uid,
    /// Concrete type first, followed by every interface it implements.
    pub types: Vec<String>,
    pub values: BTreeMap<String, StoredValue>,
}

impl Entity {
    pub fn concrete_type(&self) -> &str {
        self.types.first().map(String::as_str).unwrap_or_default()
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.types.iter().any(|name| name == type_name)
    }

    pub fn scalar(&self, predicate: &str) -> Option<&serde_json::Value> {
        match self.values.get(predicate) {
            Some(StoredValue::Scalar(value)) if !value.is_null() => Some(value),
            _ => None,
        }
    }

    pub fn edges(&self, predicate: &str) -> &[Uid] {
        match self.values.get(predicate) {
            Some(StoredValue::Edges(uids)) => uids,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewEntity {
    pub types: Vec<String>,
    pub values: BTreeMap<String, StoredValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ordering {
    pub predicate: String,
    pub descending: bool,
}

/// What to read: entities of a type matching a predicate, ordered and paginated.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub type_name: String,
    pub predicate: Predicate,
    pub order: Vec<Ordering>,
    pub first: Option<usize>,
    pub offset: usize,
}

impl Selection {
    pub fn new(type_name: impl Into<String>, predicate: Predicate) -> Self {
        Selection {
            type_name: type_name.into(),
            predicate,
            order: Vec::new(),
            first: None,
            offset: 0,
        }
    }
}

/// A unit of work against the storage engine. Nothing is visible to other transactions until
/// `commit`; dropping the transaction discards it.
#[async_trait::async_trait]
pub trait Transaction: Send {
    async fn query(&mut self, selection: &Selection) -> StoreResult<Vec<Entity>>;

    async fn get(&mut self, uid: Uid) -> StoreResult<Option<Entity>>;

    async fn insert(&mut self, entity: NewEntity) -> StoreResult<Uid>;

    async fn set(&mut self, uid: Uid, predicate: &str, value: StoredValue) -> StoreResult<()>;

    async fn unset(&mut self, uid: Uid, predicate: &str) -> StoreResult<()>;

    /// Removes the entity and every edge pointing to it.
    async fn delete(&mut self, uid: Uid) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait StoreInner: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;
}

#[derive(Clone)]
pub struct Store(Arc<dyn StoreInner>);

impl Store {
    pub fn new(inner: impl StoreInner + 'static) -> Self {
        Self(Arc::new(inner))
    }
}

impl std::ops::Deref for Store {
    type Target = dyn StoreInner;
    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

use std::{
    cmp::Ordering,
    sync::{
        atomic::{AtomicU64, Ordering as AtomicOrdering},
        Arc, Mutex, PoisonError,
    },
};

use runtime::{
    Entity, NewEntity, Selection, StoreError, StoreInner, StoreResult, StoredValue, Transaction, Uid,
};

use crate::evaluate::{compare_values, matches, Graph};

/// The committed graph and how many commits produced it.
#[derive(Default)]
struct Committed {
    graph: Graph,
    version: u64,
}

/// A process-local graph. Clones share the same data.
///
/// Transactions are optimistic: a commit aborts when another transaction committed changes to
/// anything it read since it began.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    committed: Arc<Mutex<Committed>>,
    next_uid: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed entity, in uid order.
    pub fn entities(&self) -> Vec<Entity> {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .graph
            .values()
            .cloned()
            .collect()
    }

    pub fn entities_of_type(&self, type_name: &str) -> Vec<Entity> {
        self.entities()
            .into_iter()
            .filter(|entity| entity.is_a(type_name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.committed.lock().unwrap_or_else(PoisonError::into_inner).graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl StoreInner for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let (snapshot, version) = {
            let committed = self.committed.lock().unwrap_or_else(PoisonError::into_inner);
            (committed.graph.clone(), committed.version)
        };

        Ok(Box::new(InMemoryTransaction {
            base: Arc::clone(&self.committed),
            next_uid: Arc::clone(&self.next_uid),
            version,
            working: snapshot.clone(),
            snapshot,
            reads: Vec::new(),
            log: Vec::new(),
        }))
    }
}

enum Write {
    Insert(Entity),
    Set(Uid, String, StoredValue),
    Unset(Uid, String),
    Delete(Uid),
}

enum Read {
    Query(Selection),
    Get(Uid),
}

impl Read {
    /// Committed entities the read depends on.
    fn observe(&self, graph: &Graph) -> StoreResult<Vec<Entity>> {
        match self {
            Read::Query(selection) => Ok(select(graph, selection)?.into_iter().cloned().collect()),
            Read::Get(uid) => Ok(graph.get(uid).cloned().into_iter().collect()),
        }
    }
}

struct InMemoryTransaction {
    base: Arc<Mutex<Committed>>,
    next_uid: Arc<AtomicU64>,
    /// Version of the committed graph at `begin`.
    version: u64,
    /// The committed graph at `begin`.
    snapshot: Graph,
    /// `snapshot` with this transaction's own writes applied.
    working: Graph,
    reads: Vec<Read>,
    log: Vec<Write>,
}

impl InMemoryTransaction {
    fn record(&mut self, write: Write) -> StoreResult<()> {
        apply(&mut self.working, &write)?;
        self.log.push(write);
        Ok(())
    }

    /// Fails when a read would now see different committed data than it did at `begin`.
    fn validate(&self, current: &Graph) -> StoreResult<()> {
        for read in &self.reads {
            if read.observe(current)? != read.observe(&self.snapshot)? {
                return Err(StoreError::Aborted(match read {
                    Read::Query(selection) => format!("concurrent write to {}", selection.type_name),
                    Read::Get(uid) => format!("concurrent write to {uid}"),
                }));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transaction for InMemoryTransaction {
    async fn query(&mut self, selection: &Selection) -> StoreResult<Vec<Entity>> {
        let mut found: Vec<Entity> = select(&self.working, selection)?.into_iter().cloned().collect();
        self.reads.push(Read::Query(selection.clone()));

        tracing::trace!(
            type_name = %selection.type_name,
            predicate = %selection.predicate,
            count = found.len(),
            "query"
        );

        found.sort_by(|left, right| {
            for ordering in &selection.order {
                let cmp = match (left.scalar(&ordering.predicate), right.scalar(&ordering.predicate)) {
                    (Some(left), Some(right)) => compare_values(left, right).unwrap_or(Ordering::Equal),
                    // missing values sort last in both directions
                    (Some(_), None) => return Ordering::Less,
                    (None, Some(_)) => return Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                let cmp = if ordering.descending { cmp.reverse() } else { cmp };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            left.uid.cmp(&right.uid)
        });

        let page = found.into_iter().skip(selection.offset);
        Ok(match selection.first {
            Some(first) => page.take(first).collect(),
            None => page.collect(),
        })
    }

    async fn get(&mut self, uid: Uid) -> StoreResult<Option<Entity>> {
        self.reads.push(Read::Get(uid));
        Ok(self.working.get(&uid).cloned())
    }

    async fn insert(&mut self, entity: NewEntity) -> StoreResult<Uid> {
        let uid = Uid(self.next_uid.fetch_add(1, AtomicOrdering::Relaxed) + 1);
        self.record(Write::Insert(Entity {
            uid,
            types: entity.types,
            values: entity.values,
        }))?;
        Ok(uid)
    }

    async fn set(&mut self, uid: Uid, predicate: &str, value: StoredValue) -> StoreResult<()> {
        self.record(Write::Set(uid, predicate.to_string(), value))
    }

    async fn unset(&mut self, uid: Uid, predicate: &str) -> StoreResult<()> {
        self.record(Write::Unset(uid, predicate.to_string()))
    }

    async fn delete(&mut self, uid: Uid) -> StoreResult<()> {
        self.record(Write::Delete(uid))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.log.is_empty() {
            return Ok(());
        }

        let mut committed = self.base.lock().unwrap_or_else(PoisonError::into_inner);
        if committed.version != self.version {
            self.validate(&committed.graph)?;
        }

        let mut next = committed.graph.clone();
        for write in &self.log {
            apply(&mut next, write).map_err(|err| StoreError::Aborted(err.to_string()))?;
        }
        committed.graph = next;
        committed.version += 1;

        tracing::debug!(writes = self.log.len(), version = committed.version, "committed transaction");
        Ok(())
    }
}

/// Entities of the selected type matching its predicate, unordered and unpaginated.
fn select<'g>(graph: &'g Graph, selection: &Selection) -> StoreResult<Vec<&'g Entity>> {
    let mut found = Vec::new();
    for entity in graph.values() {
        if entity.is_a(&selection.type_name) && matches(graph, entity, &selection.predicate)? {
            found.push(entity);
        }
    }
    Ok(found)
}

fn apply(graph: &mut Graph, write: &Write) -> StoreResult<()> {
    match write {
        Write::Insert(entity) => {
            graph.insert(entity.uid, entity.clone());
        }
        Write::Set(uid, predicate, value) => {
            let entity = graph.get_mut(uid).ok_or(StoreError::NotFound(*uid))?;
            entity.values.insert(predicate.clone(), value.clone());
        }
        Write::Unset(uid, predicate) => {
            let entity = graph.get_mut(uid).ok_or(StoreError::NotFound(*uid))?;
            entity.values.remove(predicate);
        }
        Write::Delete(uid) => {
            graph.remove(uid).ok_or(StoreError::NotFound(*uid))?;
            for entity in graph.values_mut() {
                for value in entity.values.values_mut() {
                    if let StoredValue::Edges(uids) = value {
                        uids.retain(|target| target != uid);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use runtime::{Ordering as SortOrder, Predicate, Store};
    use serde_json::json;

    use super::*;

    fn todo(title: &str, rank: i64) -> NewEntity {
        NewEntity {
            types: vec!["Todo".into()],
            values: [
                ("Todo.title".to_string(), StoredValue::Scalar(json!(title))),
                ("Todo.rank".to_string(), StoredValue::Scalar(json!(rank))),
            ]
            .into(),
        }
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let memory = InMemoryStore::new();
        let store = Store::new(memory.clone());

        let mut tx = store.begin().await.unwrap();
        tx.insert(todo("a", 1)).await.unwrap();
        assert!(memory.is_empty());

        let own = tx.query(&Selection::new("Todo", Predicate::True)).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(tx.get(own[0].uid).await.unwrap(), Some(own[0].clone()));

        tx.commit().await.unwrap();
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn dropped_transactions_are_discarded() {
        let memory = InMemoryStore::new();
        let store = Store::new(memory.clone());

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(todo("a", 1)).await.unwrap();
        }

        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn ordering_and_pagination() {
        let store = Store::new(InMemoryStore::new());

        let mut tx = store.begin().await.unwrap();
        for (title, rank) in [("b", 2), ("c", 3), ("a", 1)] {
            tx.insert(todo(title, rank)).await.unwrap();
        }

        let mut selection = Selection::new("Todo", Predicate::True);
        selection.order = vec![SortOrder {
            predicate: "Todo.rank".into(),
            descending: true,
        }];
        selection.first = Some(2);
        selection.offset = 1;

        let titles: Vec<_> = tx
            .query(&selection)
            .await
            .unwrap()
            .into_iter()
            .map(|entity| entity.scalar("Todo.title").cloned().unwrap())
            .collect();

        assert_eq!(titles, vec![json!("b"), json!("a")]);
    }

    #[tokio::test]
    async fn delete_removes_inbound_edges() {
        let memory = InMemoryStore::new();
        let store = Store::new(memory.clone());

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert(todo("a", 1)).await.unwrap();
        let second = tx.insert(todo("b", 2)).await.unwrap();
        tx.set(second, "Todo.next", StoredValue::Edges(vec![first]))
            .await
            .unwrap();
        tx.delete(first).await.unwrap();
        tx.commit().await.unwrap();

        let remaining = memory.entities();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].edges("Todo.next").is_empty());
    }

    #[tokio::test]
    async fn conflicting_commit_aborts() {
        let memory = InMemoryStore::new();
        let store = Store::new(memory.clone());

        let mut setup = store.begin().await.unwrap();
        let uid = setup.insert(todo("a", 1)).await.unwrap();
        setup.commit().await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.delete(uid).await.unwrap();
        second
            .set(uid, "Todo.title", StoredValue::Scalar(json!("z")))
            .await
            .unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::Aborted(_))));
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn stale_reads_abort_the_commit() {
        let memory = InMemoryStore::new();
        let store = Store::new(memory.clone());
        let alice = Selection::new("Todo", Predicate::eq("Todo.title", json!("alice")));

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        assert!(first.query(&alice).await.unwrap().is_empty());
        assert!(second.query(&alice).await.unwrap().is_empty());
        first.insert(todo("alice", 1)).await.unwrap();
        second.insert(todo("alice", 2)).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::Aborted(_))));
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn unrelated_commits_do_not_conflict() {
        let memory = InMemoryStore::new();
        let store = Store::new(memory.clone());

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first
            .query(&Selection::new("Todo", Predicate::eq("Todo.title", json!("alice"))))
            .await
            .unwrap();
        second
            .query(&Selection::new("Todo", Predicate::eq("Todo.title", json!("bob"))))
            .await
            .unwrap();
        first.insert(todo("alice", 1)).await.unwrap();
        second.insert(todo("bob", 2)).await.unwrap();

        first.commit().await.unwrap();
        second.commit().await.unwrap();
        assert_eq!(memory.len(), 2);
    }
}

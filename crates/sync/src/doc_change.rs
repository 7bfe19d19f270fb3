use std::sync::Arc;
use std::sync::Mutex;

use quillcore_protocol::Delta;
use tokio::sync::Notify;

/// One node of the editor adapter's append-only change history
/// (spec.md §3 `DocumentChange`, §9 "Cyclic / back-references"). `next`
/// resolves exactly once, when the successor change arrives; `next_now`
/// mirrors the same value synchronously once it is known. Nodes are owned
/// by a [`DocumentChangeList`] arena — never handed out with mutation
/// rights.
pub struct DocumentChange<D: Delta> {
    pub delta: D,
    pub old_contents: D,
    pub source: String,
    next_now: Mutex<Option<usize>>,
    next_ready: Notify,
}

impl<D: Delta> DocumentChange<D> {
    fn new(delta: D, old_contents: D, source: impl Into<String>) -> Self {
        Self {
            delta,
            old_contents,
            source: source.into(),
            next_now: Mutex::new(None),
            next_ready: Notify::new(),
        }
    }

    /// `nextNow`: the successor's arena index, if it has already arrived.
    pub fn next_now(&self) -> Option<usize> {
        #[allow(clippy::unwrap_used)]
        *self.next_now.lock().unwrap()
    }

    /// `next`: resolves once, the first time a successor is appended.
    pub async fn next(&self) -> usize {
        loop {
            let notified = self.next_ready.notified();
            if let Some(id) = self.next_now() {
                return id;
            }
            notified.await;
        }
    }

    fn resolve_next(&self, id: usize) {
        #[allow(clippy::unwrap_used)]
        let mut slot = self.next_now.lock().unwrap();
        if slot.is_some() {
            return;
        }
        *slot = Some(id);
        drop(slot);
        self.next_ready.notify_waiters();
    }
}

/// Arena owning the append-only list of [`DocumentChange`] nodes for one
/// editor adapter instance. The only mutator of `next`/`next_now` is
/// [`DocumentChangeList::append`], called in order of editor events —
/// matching the invariant that those fields are written at most once, by
/// the owning adapter alone.
#[derive(Default)]
pub struct DocumentChangeList<D: Delta> {
    nodes: Mutex<Vec<Arc<DocumentChange<D>>>>,
}

impl<D: Delta> DocumentChangeList<D> {
    pub fn new() -> Self {
        Self { nodes: Mutex::new(Vec::new()) }
    }

    /// Appends a new change, resolving the previous tail's `next`/`nextNow`.
    /// Returns the new node's arena index.
    pub fn append(&self, delta: D, old_contents: D, source: impl Into<String>) -> usize {
        let node = Arc::new(DocumentChange::new(delta, old_contents, source));
        #[allow(clippy::unwrap_used)]
        let mut nodes = self.nodes.lock().unwrap();
        let new_id = nodes.len();
        if let Some(prev) = nodes.last() {
            prev.resolve_next(new_id);
        }
        nodes.push(node);
        new_id
    }

    pub fn get(&self, id: usize) -> Option<Arc<DocumentChange<D>>> {
        #[allow(clippy::unwrap_used)]
        self.nodes.lock().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        #[allow(clippy::unwrap_used)]
        self.nodes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use quillcore_delta_ref::TextDelta;

    #[tokio::test]
    async fn next_resolves_exactly_once_when_a_successor_is_appended() {
        let list: DocumentChangeList<TextDelta> = DocumentChangeList::new();
        let first = list.append(TextDelta::default().insert("a"), TextDelta::default(), "user");
        let node = list.get(first).expect("node present");
        assert_eq!(node.next_now(), None);

        let second = list.append(TextDelta::default().insert("b"), TextDelta::default(), "user");
        assert_eq!(node.next_now(), Some(second));
        assert_eq!(node.next().await, second);
    }

    #[tokio::test]
    async fn next_awaits_until_the_successor_arrives() {
        let list: Arc<DocumentChangeList<TextDelta>> = Arc::new(DocumentChangeList::new());
        let first = list.append(TextDelta::default().insert("a"), TextDelta::default(), "user");
        let node = list.get(first).expect("node present");

        let list_clone = list.clone();
        let waiter = tokio::spawn(async move {
            let node = list_clone.get(0).expect("node present");
            node.next().await
        });

        tokio::task::yield_now().await;
        let second = list.append(TextDelta::default().insert("b"), TextDelta::default(), "user");
        let resolved = waiter.await.expect("waiter task");
        assert_eq!(resolved, second);
        assert_eq!(node.next_now(), Some(second));
    }
}

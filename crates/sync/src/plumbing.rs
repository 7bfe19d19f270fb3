use std::sync::Arc;
use std::time::Duration;

use quillcore_protocol::DocSnapshot;
use quillcore_protocol::Delta;
use quillcore_protocol::Priority;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::client::SyncClient;
use crate::editor::EditorHandle;
use crate::error::SyncError;
use crate::event::Event;
use crate::event::INTERNAL_SOURCE;
use crate::state::SyncState;

/// Coalesce local edits before sending (spec.md §4.7).
pub const PUSH_DELAY: Duration = Duration::from_secs(1);
/// Pace long-poll re-issues (spec.md §4.7).
pub const PULL_DELAY: Duration = Duration::from_secs(1);

/// A cheap, cloneable handle for feeding events into a running
/// [`DocumentPlumbing`] actor from outside (the editor adapter's
/// `text-change` handler, or the owner kicking things off with `start()`).
#[derive(Clone)]
pub struct PlumbingHandle<D: Delta> {
    tx: mpsc::UnboundedSender<Event<D>>,
}

impl<D: Delta> PlumbingHandle<D> {
    /// `start` — kickoff (spec.md §4.7 `detached | start`).
    pub fn start(&self) {
        let _ = self.tx.send(Event::Start);
    }

    /// Feeds the editor's own `text-change` event in. `source` equal to
    /// the instance's write-back tag is filtered inside the dispatcher,
    /// not here, so adapters do not need to know the tag.
    pub fn notify_local_delta(&self, delta: D, old_contents: D, source: impl Into<String>) {
        let _ = self.tx.send(Event::GotLocalDelta {
            delta,
            old_contents,
            source: source.into(),
        });
    }
}

/// The client-side sync controller (spec.md §4.7): a single-threaded
/// cooperative actor ([`DocumentPlumbing::run`]) reading `Event`s off an
/// mpsc channel, the same shape as the teacher's `codex.rs` submission
/// loop (a `tokio::select!`-free variant, since this actor has exactly one
/// inbound stream rather than two).
pub struct DocumentPlumbing<D, C, E>
where
    D: Delta,
    C: SyncClient<D>,
    E: EditorHandle<D>,
{
    state: SyncState,
    doc: Option<DocSnapshot<D>>,
    collected_delta: Option<D>,
    client: Arc<C>,
    editor: Arc<E>,
    write_back_tag: String,
    events_tx: mpsc::UnboundedSender<Event<D>>,
    events_rx: mpsc::UnboundedReceiver<Event<D>>,
    halted: bool,
}

impl<D, C, E> DocumentPlumbing<D, C, E>
where
    D: Delta,
    C: SyncClient<D> + 'static,
    E: EditorHandle<D> + 'static,
{
    pub fn new(client: Arc<C>, editor: Arc<E>, write_back_tag: impl Into<String>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: SyncState::Detached,
            doc: None,
            collected_delta: None,
            client,
            editor,
            write_back_tag: write_back_tag.into(),
            events_tx,
            events_rx,
            halted: false,
        }
    }

    pub fn handle(&self) -> PlumbingHandle<D> {
        PlumbingHandle { tx: self.events_tx.clone() }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn doc(&self) -> Option<&DocSnapshot<D>> {
        self.doc.as_ref()
    }

    /// Drains events until the channel closes (every [`PlumbingHandle`]
    /// clone, including this instance's own scheduled-timer senders, has
    /// been dropped). A fatal [`SyncError`] (spec.md §4.7 `any | apiError`)
    /// halts processing but does not close the channel — further sends
    /// are accepted and silently dropped.
    pub async fn run(mut self) -> Result<(), SyncError> {
        let mut fatal = None;
        while let Some(event) = self.events_rx.recv().await {
            if self.halted {
                continue;
            }
            if let Err(e) = self.dispatch(event).await {
                warn!(error = %e, "document plumbing halted");
                self.halted = true;
                fatal = Some(e);
            }
        }
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn dispatch(&mut self, event: Event<D>) -> Result<(), SyncError> {
        match event {
            Event::Start => self.on_start().await,
            Event::GotSnapshot(snapshot) => self.on_got_snapshot(snapshot),
            Event::GotDeltaAfter { base, version, delta } => self.on_got_delta_after(base, version, delta),
            Event::GotLocalDelta { delta, source, .. } => {
                if source == self.write_back_tag {
                    return Ok(());
                }
                self.on_got_local_delta(delta)
            }
            Event::WantDeltaAfter => self.on_want_delta_after(),
            Event::WantApplyDelta => self.on_want_apply_delta(),
            Event::GotApplyDelta { expected, version, correction } => {
                self.on_got_apply_delta(expected, version, correction)
            }
            Event::ApiError(e) => Err(e),
        }
    }

    async fn on_start(&mut self) -> Result<(), SyncError> {
        if self.state != SyncState::Detached {
            return Ok(());
        }
        self.state = SyncState::Starting;
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            match client.snapshot().await {
                Ok(snapshot) => {
                    let _ = tx.send(Event::GotSnapshot(snapshot));
                }
                Err(e) => {
                    let _ = tx.send(Event::ApiError(e));
                }
            }
        });
        Ok(())
    }

    fn on_got_snapshot(&mut self, snapshot: DocSnapshot<D>) -> Result<(), SyncError> {
        if self.state != SyncState::Starting {
            return Ok(());
        }
        info!(version = snapshot.version, "initial document snapshot received");
        self.doc = Some(snapshot);
        self.editor.enable_input();
        self.state = SyncState::Idle;
        self.send_want_delta_after_now();
        Ok(())
    }

    /// `idle | wantDeltaAfter`.
    fn on_want_delta_after(&mut self) -> Result<(), SyncError> {
        if self.state != SyncState::Idle {
            // `any other | wantDeltaAfter` — ignore.
            return Ok(());
        }
        #[allow(clippy::expect_used)]
        let base = self.doc.clone().expect("idle implies doc is known");
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            match client.delta_after(base.version).await {
                Ok((version, delta)) => {
                    let _ = tx.send(Event::GotDeltaAfter { base, version, delta });
                }
                Err(e) => {
                    let _ = tx.send(Event::ApiError(e));
                }
            }
        });
        Ok(())
    }

    /// `idle | gotDeltaAfter(base,v,Δ)`.
    fn on_got_delta_after(&mut self, base: DocSnapshot<D>, version: u64, delta: D) -> Result<(), SyncError> {
        if self.state != SyncState::Idle {
            // A local edit started a new collect/merge cycle while this
            // long poll was outstanding. The result is stale by the same
            // "compare base.version to doc.version" rule as any other
            // stale deltaAfter reply (spec.md §5) -- discard it rather
            // than treat it as an error. Polling resumes on its own once
            // the machine returns to idle.
            debug!(state = ?self.state, "discarding deltaAfter result received outside idle");
            return Ok(());
        }
        #[allow(clippy::expect_used)]
        let doc = self.doc.as_ref().expect("idle implies doc is known");
        if base.version == doc.version {
            if self.collected_delta.is_some() {
                // Should not happen: idle implies no collected delta. Fail
                // loudly instead of silently diverging doc from the
                // editor (spec.md §4.8).
                return Err(SyncError::VersionSkew);
            }
            self.apply_server_delta(version, &delta);
        } else {
            debug!(base = base.version, current = doc.version, "discarding stale deltaAfter result");
        }
        self.schedule_want_delta_after(PULL_DELAY);
        Ok(())
    }

    /// `idle | gotLocalDelta` and `collecting | gotLocalDelta` and
    /// `merging | gotLocalDelta` all funnel through here; only the first
    /// transitions state.
    fn on_got_local_delta(&mut self, delta: D) -> Result<(), SyncError> {
        match self.state {
            SyncState::Idle => {
                self.collected_delta = Some(delta);
                self.state = SyncState::Collecting;
                self.schedule_want_apply_delta();
            }
            SyncState::Collecting | SyncState::Merging => {
                self.collected_delta = Some(match self.collected_delta.take() {
                    Some(existing) => existing.compose(&delta),
                    None => delta,
                });
            }
            SyncState::Detached | SyncState::Starting => {
                // No document yet to diff against; drop. A real editor
                // adapter keeps input disabled until `enable_input()`, so
                // this should not be reachable in practice.
            }
        }
        Ok(())
    }

    /// `collecting | wantApplyDelta`.
    fn on_want_apply_delta(&mut self) -> Result<(), SyncError> {
        if self.state != SyncState::Collecting {
            return Ok(());
        }
        let Some(collected) = self.collected_delta.take() else {
            self.state = SyncState::Idle;
            self.send_want_delta_after_now();
            return Ok(());
        };
        if collected.is_empty() {
            self.state = SyncState::Idle;
            self.send_want_delta_after_now();
            return Ok(());
        }

        #[allow(clippy::expect_used)]
        let doc = self.doc.clone().expect("collecting implies doc is known");
        let expected = doc.data.compose(&collected);
        self.state = SyncState::Merging;

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let expected_for_call = expected.clone();
        tokio::spawn(async move {
            match client.apply_delta(doc.version, collected).await {
                Ok((version, correction)) => {
                    let _ = tx.send(Event::GotApplyDelta {
                        expected: expected_for_call,
                        version,
                        correction,
                    });
                }
                Err(e) => {
                    let _ = tx.send(Event::ApiError(e));
                }
            }
        });
        Ok(())
    }

    /// `merging | gotApplyDelta(expected,v,ΔcorrFromServer)` — the §4.7a
    /// four-case merge decision.
    fn on_got_apply_delta(&mut self, expected: D, version: u64, correction: D) -> Result<(), SyncError> {
        if self.state != SyncState::Merging {
            return Ok(());
        }
        let server_empty = correction.is_empty();
        let local_pending = self.collected_delta.take();
        let local_empty = local_pending.as_ref().map(Delta::is_empty).unwrap_or(true);

        match (server_empty, local_empty) {
            (true, true) => {
                // doc.data after this transition equals
                // compose(doc.data_before, L_sent) bit-for-bit — `expected`
                // already is exactly that (spec.md §8 "Merge identity").
                self.doc = Some(DocSnapshot::new(version, expected));
                self.state = SyncState::Idle;
                self.send_want_delta_after_now();
            }
            (true, false) => {
                #[allow(clippy::expect_used)]
                let pending = local_pending.expect("checked non-empty above");
                self.doc = Some(DocSnapshot::new(version, expected));
                self.state = SyncState::Idle;
                self.requeue_local_delta(pending);
            }
            (false, true) => {
                self.doc = Some(DocSnapshot::new(version, expected.compose(&correction)));
                self.editor.apply_delta(&correction, &self.write_back_tag);
                self.state = SyncState::Idle;
                self.send_want_delta_after_now();
            }
            (false, false) => {
                #[allow(clippy::expect_used)]
                let local = local_pending.expect("checked non-empty above");
                // Rebase (spec.md §9): transform both sides against each
                // other. `L' = transform(S, L, priority=Remote)` — the
                // server's already-accepted correction wins position ties
                // over the not-yet-sent local edits.
                let rebased_local = D::transform(&correction, &local, Priority::Remote);
                let new_doc_data = expected.compose(&correction);
                self.doc = Some(DocSnapshot::new(version, new_doc_data));
                self.editor.apply_delta(&rebased_local, &self.write_back_tag);
                self.state = SyncState::Idle;
                if rebased_local.is_empty() {
                    self.send_want_delta_after_now();
                } else {
                    self.requeue_local_delta(rebased_local);
                }
            }
        }
        Ok(())
    }

    /// Applies a server delta that arrived with no local edits in flight
    /// (spec.md §4.8): compose into `doc.data`, write to the editor under
    /// the write-back tag.
    fn apply_server_delta(&mut self, version: u64, delta: &D) {
        #[allow(clippy::expect_used)]
        let doc = self.doc.as_ref().expect("caller guarantees doc is known");
        let new_data = doc.data.compose(delta);
        self.doc = Some(DocSnapshot::new(version, new_data));
        self.editor.apply_delta(delta, &self.write_back_tag);
    }

    /// Re-enters the collect cycle with edits that are already reflected
    /// in the editor (spec.md §4.7a rows 2 and 4): enqueue a synthetic
    /// `gotLocalDelta` rather than re-deriving `idle | gotLocalDelta`'s
    /// logic by hand.
    fn requeue_local_delta(&mut self, delta: D) {
        #[allow(clippy::expect_used)]
        let old_contents = self.doc.as_ref().expect("doc set by caller").data.clone();
        let _ = self.events_tx.send(Event::GotLocalDelta {
            delta,
            old_contents,
            source: INTERNAL_SOURCE.to_string(),
        });
    }

    fn send_want_delta_after_now(&self) {
        let _ = self.events_tx.send(Event::WantDeltaAfter);
    }

    fn schedule_want_delta_after(&self, after: Duration) {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(Event::WantDeltaAfter);
        });
    }

    fn schedule_want_apply_delta(&self) {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PUSH_DELAY).await;
            let _ = tx.send(Event::WantApplyDelta);
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use quillcore_delta_ref::TextDelta;
    use tokio::sync::oneshot;
    use tokio::sync::Mutex as TokioMutex;

    use super::*;

    struct FakeClient {
        snapshot: DocSnapshot<TextDelta>,
        apply_delta_result: TokioMutex<Option<Result<(u64, TextDelta), SyncError>>>,
        delta_after_gate: TokioMutex<Option<oneshot::Receiver<Result<(u64, TextDelta), SyncError>>>>,
    }

    #[async_trait]
    impl SyncClient<TextDelta> for FakeClient {
        async fn snapshot(&self) -> Result<DocSnapshot<TextDelta>, SyncError> {
            Ok(self.snapshot.clone())
        }

        async fn apply_delta(&self, _base_version: u64, _delta: TextDelta) -> Result<(u64, TextDelta), SyncError> {
            self.apply_delta_result.lock().await.take().expect("apply_delta result configured by test")
        }

        async fn delta_after(&self, _base_version: u64) -> Result<(u64, TextDelta), SyncError> {
            let rx = self.delta_after_gate.lock().await.take().expect("delta_after gate configured by test");
            rx.await.expect("test dropped the delta_after gate sender")
        }
    }

    #[derive(Default)]
    struct FakeEditor {
        applied: StdMutex<Vec<TextDelta>>,
        enabled: AtomicBool,
    }

    impl EditorHandle<TextDelta> for FakeEditor {
        fn apply_delta(&self, delta: &TextDelta, _write_back_tag: &str) {
            self.applied.lock().unwrap().push(delta.clone());
        }

        fn enable_input(&self) {
            self.enabled.store(true, Ordering::SeqCst);
        }
    }

    fn fake_client(snapshot: DocSnapshot<TextDelta>) -> Arc<FakeClient> {
        Arc::new(FakeClient {
            snapshot,
            apply_delta_result: TokioMutex::new(None),
            delta_after_gate: TokioMutex::new(None),
        })
    }

    async fn start_and_reach_idle(
        plumbing: &mut DocumentPlumbing<TextDelta, FakeClient, FakeEditor>,
    ) {
        plumbing.dispatch(Event::Start).await.expect("start");
        let got_snapshot = plumbing.events_rx.recv().await.expect("snapshot event");
        plumbing.dispatch(got_snapshot).await.expect("apply snapshot");
        assert_eq!(plumbing.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn s6_clean_merge_updates_doc_and_returns_to_idle() {
        let snapshot = DocSnapshot::new(5, TextDelta::default().insert("D5"));
        let client = fake_client(snapshot.clone());
        let editor = Arc::new(FakeEditor::default());
        let mut plumbing = DocumentPlumbing::new(client.clone(), editor.clone(), "writeback");
        start_and_reach_idle(&mut plumbing).await;

        let delta_a = TextDelta::default().retain(2).insert("a");
        let delta_b = TextDelta::default().retain(3).insert("b");
        plumbing
            .dispatch(Event::GotLocalDelta {
                delta: delta_a.clone(),
                old_contents: TextDelta::default(),
                source: "user".to_string(),
            })
            .await
            .expect("first local delta");
        assert_eq!(plumbing.state(), SyncState::Collecting);

        plumbing
            .dispatch(Event::GotLocalDelta {
                delta: delta_b.clone(),
                old_contents: TextDelta::default(),
                source: "user".to_string(),
            })
            .await
            .expect("second local delta, coalesced");

        let expected_sent = delta_a.compose(&delta_b);
        *client.apply_delta_result.lock().await = Some(Ok((6, TextDelta::empty())));

        plumbing.dispatch(Event::WantApplyDelta).await.expect("push coalesced edits");
        assert_eq!(plumbing.state(), SyncState::Merging);

        let got_apply_delta = plumbing.events_rx.recv().await.expect("applyDelta result event");
        plumbing.dispatch(got_apply_delta).await.expect("merge result");

        assert_eq!(plumbing.state(), SyncState::Idle);
        let doc = plumbing.doc().expect("doc known");
        assert_eq!(doc.version, 6);
        assert_eq!(doc.data, snapshot.data.compose(&expected_sent));
        assert!(editor.applied.lock().unwrap().is_empty(), "clean merge never writes back to the editor");
    }

    #[tokio::test]
    async fn s7_stale_long_poll_result_is_discarded() {
        let snapshot = DocSnapshot::new(7, TextDelta::default().insert("D7"));
        let client = fake_client(snapshot.clone());
        let editor = Arc::new(FakeEditor::default());
        let mut plumbing = DocumentPlumbing::new(client.clone(), editor.clone(), "writeback");
        start_and_reach_idle(&mut plumbing).await;

        let (gate_tx, gate_rx) = oneshot::channel();
        *client.delta_after_gate.lock().await = Some(gate_rx);
        plumbing.dispatch(Event::WantDeltaAfter).await.expect("issue long poll");

        // A concurrent applyDelta flow (not modeled step by step here)
        // advances doc straight to v9 while the long poll above is still
        // pending, the way a merge completing mid-poll would.
        plumbing.doc = Some(DocSnapshot::new(9, TextDelta::default().insert("D9")));

        gate_tx.send(Ok((8, TextDelta::default().insert("stale")))).unwrap();
        let got_delta_after = plumbing.events_rx.recv().await.expect("deltaAfter result event");
        plumbing.dispatch(got_delta_after).await.expect("stale result is discarded, not an error");

        let doc = plumbing.doc().expect("doc known");
        assert_eq!(doc.version, 9, "the stale v8 delta must not overwrite the newer v9 doc");
        assert!(editor.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delta_after_result_arriving_outside_idle_is_discarded_not_fatal() {
        let snapshot = DocSnapshot::new(3, TextDelta::default().insert("D3"));
        let client = fake_client(snapshot.clone());
        let editor = Arc::new(FakeEditor::default());
        let mut plumbing = DocumentPlumbing::new(client, editor, "writeback");
        start_and_reach_idle(&mut plumbing).await;

        // A local edit arrives while a deltaAfter long poll is still
        // conceptually outstanding -- the ordinary path when another
        // client's edit (or this client's own applyDelta) advances the
        // server version mid-poll (spec.md §5).
        plumbing
            .dispatch(Event::GotLocalDelta {
                delta: TextDelta::default().insert("x"),
                old_contents: TextDelta::default(),
                source: "user".to_string(),
            })
            .await
            .expect("local edit starts a new collect cycle");
        assert_eq!(plumbing.state(), SyncState::Collecting);

        let result = plumbing
            .dispatch(Event::GotDeltaAfter {
                base: snapshot.clone(),
                version: 4,
                delta: TextDelta::default().insert("from-another-client"),
            })
            .await;

        assert!(result.is_ok(), "a deltaAfter reply arriving outside idle must not be fatal");
        assert_eq!(plumbing.state(), SyncState::Collecting, "the collect cycle is unaffected");
        assert_eq!(plumbing.doc().expect("doc known").version, 3, "the stale-context delta is not applied");
    }

    #[tokio::test]
    async fn own_write_back_source_is_ignored() {
        let snapshot = DocSnapshot::new(1, TextDelta::default());
        let client = fake_client(snapshot);
        let editor = Arc::new(FakeEditor::default());
        let mut plumbing = DocumentPlumbing::new(client, editor, "writeback-tag");
        start_and_reach_idle(&mut plumbing).await;

        plumbing
            .dispatch(Event::GotLocalDelta {
                delta: TextDelta::default().insert("x"),
                old_contents: TextDelta::default(),
                source: "writeback-tag".to_string(),
            })
            .await
            .expect("own write-back is a no-op, not an error");

        assert_eq!(plumbing.state(), SyncState::Idle);
        assert!(plumbing.collected_delta.is_none());
    }

    #[tokio::test]
    async fn rebase_transforms_both_sides_when_server_and_local_both_have_pending_work() {
        let snapshot = DocSnapshot::new(1, TextDelta::default().insert("abc"));
        let client = fake_client(snapshot.clone());
        let editor = Arc::new(FakeEditor::default());
        let mut plumbing = DocumentPlumbing::new(client.clone(), editor.clone(), "writeback");
        start_and_reach_idle(&mut plumbing).await;

        let local = TextDelta::default().retain(1).insert("Y");
        plumbing
            .dispatch(Event::GotLocalDelta {
                delta: local.clone(),
                old_contents: TextDelta::default(),
                source: "user".to_string(),
            })
            .await
            .expect("collect local edit");

        let server_correction = TextDelta::default().retain(3).insert("X");
        *client.apply_delta_result.lock().await = Some(Ok((2, server_correction.clone())));
        plumbing.dispatch(Event::WantApplyDelta).await.expect("send to server");

        // A second local edit arrives while the request is in flight.
        let more_local = TextDelta::default().retain(4).insert("Z");
        plumbing
            .dispatch(Event::GotLocalDelta {
                delta: more_local.clone(),
                old_contents: TextDelta::default(),
                source: "user".to_string(),
            })
            .await
            .expect("accumulate while merging");

        let got_apply_delta = plumbing.events_rx.recv().await.expect("applyDelta result event");
        plumbing.dispatch(got_apply_delta).await.expect("rebase branch");

        // Both sides had pending work, so the editor must have received a
        // rebased local delta and doc must reflect the server's side.
        let applied = editor.applied.lock().unwrap();
        assert_eq!(applied.len(), 1, "the rebased local delta is written back exactly once");
    }
}

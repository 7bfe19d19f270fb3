/// `DocumentPlumbing`'s states (spec.md §4.7). There is no terminal state;
/// the machine lives for the editor's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Detached,
    Starting,
    Idle,
    Collecting,
    Merging,
}

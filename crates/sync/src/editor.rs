use quillcore_protocol::Delta;

/// The local rich-text widget `DocumentPlumbing` drives (spec.md §4.7,
/// §4.8). Out of scope for this crate (spec.md §1 Non-goals: no editor
/// widget is implemented) — this is the seam a real adapter (Quill, a
/// native text view, …) implements.
pub trait EditorHandle<D: Delta>: Send + Sync {
    /// Applies `delta` to the editor's current content, tagging the write
    /// with `write_back_tag` so the adapter's own re-entrant `text-change`
    /// event can be filtered out by the tag comparison in
    /// [`crate::event::Event::GotLocalDelta`]'s `source`.
    fn apply_delta(&self, delta: &D, write_back_tag: &str);

    /// Called once the initial snapshot has been applied and the editor
    /// is safe for the user to type into.
    fn enable_input(&self);
}

use serde::Serialize;

/// Whether a staged (caller-owned, uncommitted) collection differs from
/// the persisted one. The UI's "leave without saving?" confirmation is
/// driven by this predicate; the engine only answers the question, it does
/// not own the prompt. Serialization failures read as dirty.
pub fn has_unsaved_changes<T: Serialize>(proposed: &[T], persisted: &[T]) -> bool {
    match (
        serde_json::to_value(proposed),
        serde_json::to_value(persisted),
    ) {
        (Ok(a), Ok(b)) => a != b,
        _ => true,
    }
}

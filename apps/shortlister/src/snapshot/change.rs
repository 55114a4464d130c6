use super::CanonicalSnapshot;

/// True when `current` differs from the previously stored snapshot.
///
/// Value equality over every field, including the order of work history.
/// No previous snapshot counts as a change. This gates the LLM call only;
/// shortlist evaluation runs regardless.
pub fn has_changed(current: &CanonicalSnapshot, previous: Option<&CanonicalSnapshot>) -> bool {
    previous != Some(current)
}

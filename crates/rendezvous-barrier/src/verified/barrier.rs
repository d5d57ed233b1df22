//! Pure double barrier computation functions.
//!
//! Quorum and drain decisions, root value encoding, member naming and the
//! participant state machine. All functions are deterministic and free of I/O.
//!
//! # Tiger Style
//!
//! - Explicit types (u32 counts, not usize)
//! - Total functions: malformed input yields `None`/`false`, never a panic

use crate::constants::MAX_ALIAS_SIZE;
use crate::constants::MAX_BARRIER_TARGET_COUNT;
use crate::constants::MEMBER_SEQUENCE_SEPARATOR;
use crate::constants::READY_MARKER_NAME;
use crate::types::ParticipantState;

// ============================================================================
// Root Value Encoding
// ============================================================================

/// Encode a target count as the ASCII decimal value stored in the barrier root.
#[inline]
pub fn encode_target_count(target_count: u32) -> Vec<u8> {
    target_count.to_string().into_bytes()
}

/// Parse the barrier root's stored value back into a target count.
///
/// # Returns
///
/// `None` unless the value is a non-empty run of ASCII digits encoding a count
/// in `1..=MAX_BARRIER_TARGET_COUNT`.
pub fn parse_target_count(data: &[u8]) -> Option<u32> {
    if data.is_empty() || !data.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let text = std::str::from_utf8(data).ok()?;
    let count: u32 = text.parse().ok()?;
    is_valid_target_count(count).then_some(count)
}

/// Check that a target count is usable.
#[inline]
pub fn is_valid_target_count(target_count: u32) -> bool {
    (1..=MAX_BARRIER_TARGET_COUNT).contains(&target_count)
}

// ============================================================================
// Membership
// ============================================================================

/// Check that an alias can prefix member node names.
///
/// Aliases become `<alias>-<sequence>` children of the root, so they must be a
/// single non-empty path segment and must not collide with the ready marker.
pub fn is_valid_alias(alias: &str) -> bool {
    !alias.is_empty()
        && alias.len() <= MAX_ALIAS_SIZE as usize
        && alias != READY_MARKER_NAME
        && alias != "."
        && alias != ".."
        && !alias.contains('/')
        && !alias.contains('\0')
}

/// Name prefix a participant's sequential member node is created with.
///
/// # Example
///
/// ```ignore
/// assert_eq!(member_name_prefix("worker"), "worker-");
/// ```
#[inline]
pub fn member_name_prefix(alias: &str) -> String {
    format!("{alias}{MEMBER_SEQUENCE_SEPARATOR}")
}

/// Number of children that are member nodes (everything but the ready marker).
pub fn count_members<S: AsRef<str>>(children: &[S]) -> u32 {
    children.iter().filter(|child| child.as_ref() != READY_MARKER_NAME).count() as u32
}

// ============================================================================
// Quorum and Drain
// ============================================================================

/// Check whether enough members are present to open the barrier.
#[inline]
pub fn is_entry_quorum_reached(member_count: u32, target_count: u32) -> bool {
    member_count >= target_count
}

/// Check whether the round a leaving participant belongs to has drained.
///
/// A round is drained when the root has no children, when its only child is
/// the ready marker, or when the marker is gone. Only a leaver that observed
/// the drain deletes the marker, so its absence proves the round emptied even
/// if members of the next round have already joined.
pub fn is_round_drained<S: AsRef<str>>(children: &[S]) -> bool {
    match children {
        [only] if only.as_ref() == READY_MARKER_NAME => true,
        _ => !has_ready_marker(children),
    }
}

/// Whether the ready marker is among `children`.
#[inline]
pub fn has_ready_marker<S: AsRef<str>>(children: &[S]) -> bool {
    children.iter().any(|child| child.as_ref() == READY_MARKER_NAME)
}

// ============================================================================
// Participant State Machine
// ============================================================================

/// Check whether a participant may move from `from` to `to`.
pub fn is_valid_participant_transition(from: ParticipantState, to: ParticipantState) -> bool {
    use ParticipantState::*;

    match (from, to) {
        (Failed, _) => false,
        (_, Failed) => true,
        (Uninitialized, Initialized) => true,
        (Initialized | Left, Entering) => true,
        (Entering, Entered | Initialized | Left) => true,
        (Entered, Leaving) => true,
        (Leaving, Left) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_count_encoding() {
        assert_eq!(encode_target_count(3), b"3".to_vec());
        assert_eq!(encode_target_count(65535), b"65535".to_vec());
        assert_eq!(parse_target_count(b"3"), Some(3));
        assert_eq!(parse_target_count(b"012"), Some(12));
    }

    #[test]
    fn test_parse_target_count_rejects_garbage() {
        assert_eq!(parse_target_count(b""), None);
        assert_eq!(parse_target_count(b"0"), None);
        assert_eq!(parse_target_count(b"-1"), None);
        assert_eq!(parse_target_count(b" 3"), None);
        assert_eq!(parse_target_count(b"3\n"), None);
        assert_eq!(parse_target_count(b"99999999999"), None);
        assert_eq!(parse_target_count(b"65536"), None);
    }

    #[test]
    fn test_alias_validation() {
        assert!(is_valid_alias("worker"));
        assert!(is_valid_alias("thread-1"));
        assert!(!is_valid_alias(""));
        assert!(!is_valid_alias("ready"));
        assert!(!is_valid_alias("a/b"));
        assert!(!is_valid_alias(".."));
        assert!(!is_valid_alias(&"x".repeat(MAX_ALIAS_SIZE as usize + 1)));
    }

    #[test]
    fn test_count_members_excludes_marker() {
        assert_eq!(count_members::<&str>(&[]), 0);
        assert_eq!(count_members(&["a-0000000000", "ready", "b-0000000001"]), 2);
        assert_eq!(count_members(&["ready"]), 0);
    }

    #[test]
    fn test_entry_quorum() {
        assert!(!is_entry_quorum_reached(2, 3));
        assert!(is_entry_quorum_reached(3, 3));
        assert!(is_entry_quorum_reached(4, 3));
    }

    #[test]
    fn test_round_drained() {
        assert!(is_round_drained::<&str>(&[]));
        assert!(is_round_drained(&["ready"]));
        assert!(!is_round_drained(&["ready", "w-0000000001"]));
        assert!(!is_round_drained(&["w-0000000001", "ready", "v-0000000002"]));
        // Marker already deleted by the last leaver; next-round members joined.
        assert!(is_round_drained(&["w-0000000003"]));
        assert!(is_round_drained(&["w-0000000003", "v-0000000004"]));
    }

    #[test]
    fn test_participant_transitions() {
        use ParticipantState::*;

        assert!(is_valid_participant_transition(Uninitialized, Initialized));
        assert!(is_valid_participant_transition(Initialized, Entering));
        assert!(is_valid_participant_transition(Entering, Entered));
        assert!(is_valid_participant_transition(Entered, Leaving));
        assert!(is_valid_participant_transition(Leaving, Left));
        assert!(is_valid_participant_transition(Left, Entering));
        assert!(is_valid_participant_transition(Entering, Initialized));
        assert!(is_valid_participant_transition(Entered, Failed));

        assert!(!is_valid_participant_transition(Uninitialized, Entering));
        assert!(!is_valid_participant_transition(Initialized, Leaving));
        assert!(!is_valid_participant_transition(Entered, Entering));
        assert!(!is_valid_participant_transition(Left, Leaving));
        assert!(!is_valid_participant_transition(Failed, Initialized));
        assert!(!is_valid_participant_transition(Failed, Failed));
    }
}

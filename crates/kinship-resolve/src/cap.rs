//! Member-count capping.

use std::collections::HashSet;

use kinship_core::{CitizenId, FamilyGraphResult, FamilyMember};

/// Trim `result` to at most `max_members` members.
///
/// The root stays first; the others are ranked by confidence (ties keep
/// their order) and the tail is dropped along with every link touching a
/// dropped member. Returns the number of members removed.
pub fn enforce_member_cap(result: &mut FamilyGraphResult, max_members: usize) -> usize {
    let max_members = max_members.max(1);
    if result.members.len() <= max_members {
        return 0;
    }
    let before = result.members.len();

    let root_pos = result
        .members
        .iter()
        .position(|m| m.citizen_id == result.citizen_id);
    let root = root_pos.map(|pos| result.members.remove(pos));

    let keep_others = max_members - usize::from(root.is_some());
    result
        .members
        .sort_by(|a, b| b.confidence.cmp(&a.confidence));
    result.members.truncate(keep_others);
    if let Some(root) = root {
        result.members.insert(0, root);
    }

    let kept: HashSet<CitizenId> = result.members.iter().map(|m| m.citizen_id).collect();
    result
        .links
        .retain(|l| kept.contains(&l.from) && kept.contains(&l.to));

    let removed = before - result.members.len();
    tracing::debug!(
        citizen_id = %result.citizen_id,
        removed,
        "Trimmed family graph to member cap"
    );
    removed
}

/// Make `root` the first and only entry for the root citizen.
pub fn pin_root(result: &mut FamilyGraphResult, root: FamilyMember) {
    result.members.retain(|m| m.citizen_id != root.citizen_id);
    result.members.insert(0, root);
}

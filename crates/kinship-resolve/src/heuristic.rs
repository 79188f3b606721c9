//! Heuristic relationship inference from address, age, and gender.
//!
//! Used only when neither the graph store nor the relationship cache knows
//! anything about a citizen. Every rule is a small pure function over a
//! [`Candidate`]; [`infer_family`] composes them:
//!
//! 1. the first candidate that classifies as a spouse wins;
//! 2. with a spouse, children are taken from exact-address candidates only;
//! 3. without one, candidates become generic family members.

use chrono::NaiveDate;
use kinship_core::types::FAMILY_MEMBER_LABEL;
use kinship_core::{
    AddressTier, CitizenRecord, FamilyGraphResult, FamilyLink, FamilyMember, Gender,
    ResolutionTier,
};

use crate::cap::enforce_member_cap;

/// Largest age gap (years) allowed between spouses.
pub const SPOUSE_MAX_AGE_GAP: u32 = 15;

/// A child must be more than this many years younger than the parent.
pub const CHILD_MIN_AGE_GAP: u32 = 15;

pub const MAX_CHILDREN: usize = 6;

pub const CHILD_CONFIDENCE: u8 = 80;

const SPOUSE_LABEL: &str = "Spouse";
const CHILD_LABEL: &str = "Child";
const PARENT_LABEL: &str = "Parent";

/// A citizen considered as a possible relative of the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub record: CitizenRecord,
    pub tier: AddressTier,
    pub age: Option<u32>,
}

impl Candidate {
    pub fn new(root: &CitizenRecord, record: CitizenRecord, today: NaiveDate) -> Self {
        let tier = address_tier(root, &record);
        let age = record.age_on(today);
        Self { record, tier, age }
    }

    fn member(&self, relationship: &str, confidence: u8) -> FamilyMember {
        FamilyMember {
            citizen_id: self.record.id,
            name: self.record.full_name.clone(),
            relationship: relationship.to_string(),
            age: self.age,
            gender: self.record.gender,
            confidence,
        }
    }
}

/// Most specific address field shared by the two records.
pub fn address_tier(root: &CitizenRecord, candidate: &CitizenRecord) -> AddressTier {
    [AddressTier::Exact, AddressTier::City, AddressTier::District]
        .into_iter()
        .find(|tier| root.shares(candidate, *tier))
        .unwrap_or(AddressTier::NoMatch)
}

/// Absolute age difference, or `None` if either age is unknown.
pub fn age_gap_years(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    Some(a?.abs_diff(b?))
}

pub fn spouse_confidence(tier: AddressTier) -> Option<u8> {
    match tier {
        AddressTier::Exact => Some(85),
        AddressTier::City => Some(70),
        AddressTier::District => Some(60),
        AddressTier::NoMatch => None,
    }
}

pub fn family_member_confidence(tier: AddressTier) -> Option<u8> {
    match tier {
        AddressTier::Exact => Some(75),
        AddressTier::City => Some(60),
        AddressTier::District => Some(50),
        AddressTier::NoMatch => None,
    }
}

/// Confidence that `candidate` is the root's spouse.
///
/// Requires opposite genders and an age gap of at most
/// [`SPOUSE_MAX_AGE_GAP`]; an unknown age passes the gap test.
pub fn classify_spouse(
    root_gender: Option<Gender>,
    root_age: Option<u32>,
    candidate: &Candidate,
) -> Option<u8> {
    let (root_gender, gender) = (root_gender?, candidate.record.gender?);
    if !root_gender.is_opposite(&gender) {
        return None;
    }
    if age_gap_years(root_age, candidate.age).is_some_and(|gap| gap > SPOUSE_MAX_AGE_GAP) {
        return None;
    }
    spouse_confidence(candidate.tier)
}

/// Confidence that `candidate` is the root's child.
///
/// Exact-address candidates only, both ages known, and the candidate
/// strictly more than [`CHILD_MIN_AGE_GAP`] years younger.
pub fn classify_child(root_age: Option<u32>, candidate: &Candidate) -> Option<u8> {
    if candidate.tier != AddressTier::Exact {
        return None;
    }
    let (parent_age, child_age) = (root_age?, candidate.age?);
    (child_age + CHILD_MIN_AGE_GAP < parent_age).then_some(CHILD_CONFIDENCE)
}

/// Age-gap plausibility for relatives matched only by city or district.
///
/// Kept exactly as deployed: `gap <= 20 || gap >= 15` admits every known
/// gap, and an unknown gap is admitted too.
pub fn plausible_relative_gap(gap: Option<u32>) -> bool {
    match gap {
        Some(gap) => gap <= 20 || gap >= 15,
        None => true,
    }
}

/// Confidence that `candidate` is some relative of the root.
pub fn classify_generic_family(root_age: Option<u32>, candidate: &Candidate) -> Option<u8> {
    match candidate.tier {
        AddressTier::Exact => family_member_confidence(AddressTier::Exact),
        AddressTier::City | AddressTier::District => {
            if plausible_relative_gap(age_gap_years(root_age, candidate.age)) {
                family_member_confidence(candidate.tier)
            } else {
                None
            }
        }
        AddressTier::NoMatch => None,
    }
}

/// Infer a family graph for `root` from its candidate pool.
///
/// The result always starts with the root as "Self" and never holds more
/// than `max_members` members.
pub fn infer_family(
    root: &CitizenRecord,
    candidates: &[Candidate],
    today: NaiveDate,
    max_members: usize,
) -> FamilyGraphResult {
    let root_age = root.age_on(today);
    let mut result = FamilyGraphResult::self_only(root, ResolutionTier::Heuristic, today);
    let candidates: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.record.id != root.id)
        .collect();

    let spouse = candidates.iter().find_map(|c| {
        classify_spouse(root.gender, root_age, c).map(|confidence| (*c, confidence))
    });

    match spouse {
        Some((spouse, confidence)) => {
            tracing::debug!(
                citizen_id = %root.id,
                spouse_id = %spouse.record.id,
                tier = ?spouse.tier,
                confidence,
                "Inferred spouse"
            );
            result.members.push(spouse.member(SPOUSE_LABEL, confidence));
            result.links.push(FamilyLink {
                from: root.id,
                to: spouse.record.id,
                relationship: SPOUSE_LABEL.to_string(),
                confidence,
            });

            let mut children = 0;
            for candidate in candidates.iter().filter(|c| c.record.id != spouse.record.id) {
                if children >= MAX_CHILDREN || result.members.len() >= max_members {
                    break;
                }
                let Some(confidence) = classify_child(root_age, candidate) else {
                    continue;
                };
                tracing::debug!(
                    citizen_id = %root.id,
                    child_id = %candidate.record.id,
                    "Inferred child"
                );
                result.members.push(candidate.member(CHILD_LABEL, confidence));
                for parent in [root.id, spouse.record.id] {
                    result.links.push(FamilyLink {
                        from: parent,
                        to: candidate.record.id,
                        relationship: PARENT_LABEL.to_string(),
                        confidence,
                    });
                }
                children += 1;
            }
        }
        None => {
            for candidate in &candidates {
                if result.members.len() >= max_members {
                    break;
                }
                let Some(confidence) = classify_generic_family(root_age, candidate) else {
                    continue;
                };
                result
                    .members
                    .push(candidate.member(FAMILY_MEMBER_LABEL, confidence));
                result.links.push(FamilyLink {
                    from: root.id,
                    to: candidate.record.id,
                    relationship: FAMILY_MEMBER_LABEL.to_string(),
                    confidence,
                });
            }
        }
    }

    enforce_member_cap(&mut result, max_members);
    result
}

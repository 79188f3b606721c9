//! Core domain types for family relationship resolution.
//!
//! These types are shared by the graph adapter, the relational stores,
//! and the resolver. Citizen records are canonical and read-only here;
//! relationship edges are the unit of the relationship cache.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label of the querying citizen in every family graph result.
pub const SELF_LABEL: &str = "Self";

/// Label for relatives whose exact relationship is unknown.
pub const FAMILY_MEMBER_LABEL: &str = "Family Member";

/// Confidence assigned to the querying citizen.
pub const SELF_CONFIDENCE: u8 = 100;

/// Maximum family graph size, self included.
pub const MAX_FAMILY_MEMBERS: usize = 8;

// ── Citizen ───────────────────────────────────────────────────────

/// Canonical identifier of a citizen record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CitizenId(pub Uuid);

impl CitizenId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CitizenId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CitizenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CitizenId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "MALE",
            Self::Female => "FEMALE",
            Self::Other => "OTHER",
        }
    }

    /// Parse the loosely formatted gender values found in citizen and
    /// graph data ("M", "male", "Female", ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "M" | "MALE" => Some(Self::Male),
            "F" | "FEMALE" => Some(Self::Female),
            "O" | "OTHER" => Some(Self::Other),
            _ => None,
        }
    }

    /// Male and female are each other's opposite; other has none.
    pub fn is_opposite(&self, other: &Gender) -> bool {
        matches!(
            (self, other),
            (Self::Male, Self::Female) | (Self::Female, Self::Male)
        )
    }
}

/// A canonical citizen record as held by the citizen record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitizenRecord {
    pub id: CitizenId,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address_line: String,
    pub city: String,
    pub district: String,
    pub national_id: Option<String>,
}

impl CitizenRecord {
    /// Age in completed years on the given day, if the birth date is known.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.date_of_birth.map(|dob| age_between(dob, today))
    }

    /// Whether two records share the address field selected by `tier`.
    ///
    /// Fields compare trimmed and case-insensitively; an empty field never
    /// matches anything.
    pub fn shares(&self, other: &CitizenRecord, tier: AddressTier) -> bool {
        match tier {
            AddressTier::Exact => same_field(&self.address_line, &other.address_line),
            AddressTier::City => same_field(&self.city, &other.city),
            AddressTier::District => same_field(&self.district, &other.district),
            AddressTier::NoMatch => false,
        }
    }
}

/// Completed years between a birth date and `today`. Future birth dates yield 0.
pub fn age_between(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Case-insensitive, whitespace-trimmed equality of two address fields.
pub fn same_field(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}

/// Specificity of the address overlap between two citizens.
///
/// Ordered from most to least specific.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AddressTier {
    Exact,
    City,
    District,
    NoMatch,
}

// ── Relationships ─────────────────────────────────────────────────

/// The type of a directed relationship edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Spouse,
    Child,
    Parent,
    Sibling,
    CoResident,
    CoBenefit,
    EmployeeOf,
    BusinessPartner,
    ShgMember,
    FamilyMember,
}

impl RelationshipType {
    /// The stored / Cypher form of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spouse => "SPOUSE",
            Self::Child => "CHILD",
            Self::Parent => "PARENT",
            Self::Sibling => "SIBLING",
            Self::CoResident => "CO_RESIDENT",
            Self::CoBenefit => "CO_BENEFIT",
            Self::EmployeeOf => "EMPLOYEE_OF",
            Self::BusinessPartner => "BUSINESS_PARTNER",
            Self::ShgMember => "SHG_MEMBER",
            Self::FamilyMember => "FAMILY_MEMBER",
        }
    }

    /// Parse a stored or graph relationship name. `SAME_HOUSEHOLD` is
    /// accepted as an alias of `CO_RESIDENT`.
    pub fn parse(raw: &str) -> Option<Self> {
        let ty = match raw.trim().to_ascii_uppercase().as_str() {
            "SPOUSE" => Self::Spouse,
            "CHILD" => Self::Child,
            "PARENT" => Self::Parent,
            "SIBLING" => Self::Sibling,
            "CO_RESIDENT" | "SAME_HOUSEHOLD" => Self::CoResident,
            "CO_BENEFIT" => Self::CoBenefit,
            "EMPLOYEE_OF" => Self::EmployeeOf,
            "BUSINESS_PARTNER" => Self::BusinessPartner,
            "SHG_MEMBER" => Self::ShgMember,
            "FAMILY_MEMBER" => Self::FamilyMember,
            _ => return None,
        };
        Some(ty)
    }

    /// Label of the edge's target as seen from its source
    /// (`a -[CHILD]-> b` makes b a "Child").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Spouse => "Spouse",
            Self::Child => "Child",
            Self::Parent => "Parent",
            Self::Sibling => "Sibling",
            Self::CoResident => "Co-Resident",
            Self::CoBenefit => "Co-Beneficiary",
            Self::EmployeeOf => "Employer",
            Self::BusinessPartner => "Business Partner",
            Self::ShgMember => "SHG Member",
            Self::FamilyMember => FAMILY_MEMBER_LABEL,
        }
    }

    /// Label of the edge's source as seen from its target
    /// (`a -[CHILD]-> b` makes a b's "Parent").
    pub fn inverse_label(&self) -> &'static str {
        match self {
            Self::Child => "Parent",
            Self::Parent => "Child",
            Self::EmployeeOf => "Employee",
            other => other.label(),
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a cached relationship edge came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipSource {
    Graph,
    Manual,
}

impl RelationshipSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graph => "GRAPH",
            Self::Manual => "MANUAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GRAPH" => Some(Self::Graph),
            "MANUAL" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Composite identity of a relationship edge. At most one edge per key is
/// stored for a citizen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub from: CitizenId,
    pub to: CitizenId,
    pub relationship_type: RelationshipType,
}

/// A directed relationship edge held in the relationship cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipEdge {
    pub from_citizen_id: CitizenId,
    pub to_citizen_id: CitizenId,
    pub relationship_type: RelationshipType,
    /// Display label of the target as seen from the source.
    pub label: String,
    /// 0–100.
    pub confidence: u8,
    pub verified: bool,
    pub source: RelationshipSource,
    pub depth: u32,
    pub synced_at: DateTime<Utc>,
    /// `None` for manual edges, which never expire.
    pub expires_at: Option<DateTime<Utc>>,
}

impl RelationshipEdge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            from: self.from_citizen_id,
            to: self.to_citizen_id,
            relationship_type: self.relationship_type,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

/// A relationship asserted by an operator, keyed by the related citizen's
/// national id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipAssertion {
    pub related_citizen_national_id: String,
    pub relationship_type: RelationshipType,
    pub label: String,
    pub confidence: u8,
}

// ── Family graph ──────────────────────────────────────────────────

/// Which resolution tier produced a family graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Graph,
    Cache,
    Heuristic,
}

/// One member of a resolved family graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyMember {
    pub citizen_id: CitizenId,
    pub name: String,
    /// Relationship to the querying citizen ("Self", "Spouse", ...).
    pub relationship: String,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub confidence: u8,
}

impl FamilyMember {
    /// The querying citizen's own entry.
    pub fn root(record: &CitizenRecord, today: NaiveDate) -> Self {
        Self {
            citizen_id: record.id,
            name: record.full_name.clone(),
            relationship: SELF_LABEL.to_string(),
            age: record.age_on(today),
            gender: record.gender,
            confidence: SELF_CONFIDENCE,
        }
    }

    pub fn is_self(&self) -> bool {
        self.relationship == SELF_LABEL
    }
}

/// A directed, labelled link between two members of a family graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyLink {
    pub from: CitizenId,
    pub to: CitizenId,
    pub relationship: String,
    pub confidence: u8,
}

/// The resolved family graph of one citizen.
///
/// The querying citizen appears exactly once, first, labelled "Self".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FamilyGraphResult {
    pub citizen_id: CitizenId,
    pub tier: ResolutionTier,
    pub members: Vec<FamilyMember>,
    pub links: Vec<FamilyLink>,
}

impl FamilyGraphResult {
    /// A result holding only the querying citizen.
    pub fn self_only(record: &CitizenRecord, tier: ResolutionTier, today: NaiveDate) -> Self {
        Self {
            citizen_id: record.id,
            tier,
            members: vec![FamilyMember::root(record, today)],
            links: Vec::new(),
        }
    }

    pub fn contains(&self, id: &CitizenId) -> bool {
        self.members.iter().any(|m| &m.citizen_id == id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

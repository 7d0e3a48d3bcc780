//! Organization model: people, positions, and assignments
//!
//! Positions form a strict tree via a nullable parent reference. The types
//! here do not enforce acyclicity; the hierarchy resolver guards against
//! cycles during traversal because the graph is externally editable.

use crate::{DepartmentId, PersonId, PositionId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Role Tag ─────────────────────────────────────────────────────────

/// Role category carried by a position (USER, MANAGER, HOD, ADMIN, ...).
///
/// The set is open-ended: new tags can appear through administrative
/// configuration without a code change. Tags are uppercase-normalized on
/// construction, so comparisons are case-insensitive by construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoleTag(String);

impl RoleTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for RoleTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoleTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

// ── Department ───────────────────────────────────────────────────────

/// An organizational department
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    /// Free-form region label supplied by administrators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Department {
    pub fn new(id: DepartmentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

// ── Position ─────────────────────────────────────────────────────────

/// A node in the reporting tree.
///
/// The parent reference is weak: a position does not own its parent, and a
/// root position has none. Upward traversal must terminate at a root.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub title: String,
    /// The role category this position carries for approval routing
    pub role: RoleTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<DepartmentId>,
    /// The position this one reports to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<PositionId>,
}

impl Position {
    pub fn new(id: PositionId, title: impl Into<String>, role: RoleTag) -> Self {
        Self {
            id,
            title: title.into(),
            role,
            department_id: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: PositionId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_department(mut self, department: DepartmentId) -> Self {
        self.department_id = Some(department);
        self
    }

    /// Whether this position is a root of the reporting tree
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ── Person ───────────────────────────────────────────────────────────

/// A person known to the identity collaborator.
///
/// The routing core consumes only `id` and `is_active`; the remaining
/// fields are carried for timelines and notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub is_admin: bool,
}

impl Person {
    pub fn new(id: PersonId, email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: full_name.into(),
            is_active: true,
            is_admin: false,
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

// ── Assignment ───────────────────────────────────────────────────────

/// The many-to-many edge between a person and a position.
///
/// An assignment with an `end_date` in the past is no longer current and is
/// ignored by occupant resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assignment {
    pub person_id: PersonId,
    pub position_id: PositionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Assignment {
    pub fn new(person_id: PersonId, position_id: PositionId) -> Self {
        Self {
            person_id,
            position_id,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_start_date(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn with_end_date(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    /// Whether the assignment is in force on the given date.
    ///
    /// An undated assignment is always current; a start date in the future
    /// or an end date on/before `as_of` makes it not current.
    pub fn is_current(&self, as_of: NaiveDate) -> bool {
        let started = self.start_date.map_or(true, |start| start <= as_of);
        let not_ended = self.end_date.map_or(true, |end| as_of < end);
        started && not_ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tag_normalization() {
        assert_eq!(RoleTag::new("manager"), RoleTag::new("MANAGER"));
        assert_eq!(RoleTag::new("  Hod "), RoleTag::new("HOD"));
        assert_eq!(RoleTag::new("hod").as_str(), "HOD");
    }

    #[test]
    fn test_role_tag_deserialize_normalizes() {
        let tag: RoleTag = serde_json::from_str("\"manager\"").unwrap();
        assert_eq!(tag, RoleTag::new("MANAGER"));
    }

    #[test]
    fn test_position_builder() {
        let root = Position::new(PositionId::new("root"), "CEO", RoleTag::new("ADMIN"));
        assert!(root.is_root());

        let child = Position::new(PositionId::new("eng"), "Engineer", RoleTag::new("USER"))
            .with_parent(PositionId::new("root"))
            .with_department(DepartmentId::new("dep-eng"));
        assert!(!child.is_root());
        assert_eq!(child.parent, Some(PositionId::new("root")));
    }

    #[test]
    fn test_assignment_currency() {
        let day = |s: &str| s.parse::<NaiveDate>().unwrap();
        let open = Assignment::new(PersonId::new("p1"), PositionId::new("pos"));
        assert!(open.is_current(day("2024-06-01")));

        let dated = open
            .clone()
            .with_start_date(day("2024-01-01"))
            .with_end_date(day("2024-06-01"));
        assert!(dated.is_current(day("2024-03-15")));
        assert!(!dated.is_current(day("2024-06-01"))); // end date exclusive
        assert!(!dated.is_current(day("2023-12-31"))); // not yet started
    }

    #[test]
    fn test_person_flags() {
        let person = Person::new(PersonId::new("p1"), "a@example.com", "Ada");
        assert!(person.is_active);
        assert!(!person.is_admin);
        assert!(!person.clone().deactivated().is_active);
        assert!(person.admin().is_admin);
    }
}

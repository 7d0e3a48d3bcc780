//! Hierarchy resolver: bounded upward walks over the reporting tree

use crate::OrgDirectory;
use chrono::{NaiveDate, Utc};
use formroute_types::{Person, PersonId, Position, PositionId, RoutingError, RoutingResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Upper bound on the length of an ancestor chain.
///
/// Real org charts top out in the tens of levels; anything deeper is a
/// misconfigured graph even if it happens to be acyclic.
pub const MAX_CHAIN_DEPTH: usize = 64;

/// Resolves positions, occupants, and ancestor chains against an
/// [`OrgDirectory`]. Read-only; safe to share across routing operations.
#[derive(Clone, Debug)]
pub struct HierarchyResolver<D: OrgDirectory> {
    directory: Arc<D>,
}

impl<D: OrgDirectory> HierarchyResolver<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// The ancestor chain of a position, starting at the position itself
    /// and proceeding strictly upward to a root.
    ///
    /// The hierarchy is externally editable, so the walk carries an
    /// explicit visited set: a cycle surfaces as
    /// [`RoutingError::HierarchyCycle`] and a chain longer than
    /// [`MAX_CHAIN_DEPTH`] as [`RoutingError::HierarchyTooDeep`], never an
    /// infinite loop. A dangling parent reference is
    /// [`RoutingError::PositionNotFound`].
    pub fn ancestor_chain(&self, start: &PositionId) -> RoutingResult<Vec<Position>> {
        let mut current = self
            .directory
            .position(start)?
            .ok_or_else(|| RoutingError::PositionNotFound(start.clone()))?;

        let mut chain = Vec::new();
        let mut visited: HashSet<PositionId> = HashSet::new();

        loop {
            if !visited.insert(current.id.clone()) {
                return Err(RoutingError::HierarchyCycle(current.id));
            }
            if chain.len() >= MAX_CHAIN_DEPTH {
                return Err(RoutingError::HierarchyTooDeep(start.clone()));
            }

            let parent = current.parent.clone();
            chain.push(current);

            match parent {
                None => break,
                Some(parent_id) => {
                    current = self
                        .directory
                        .position(&parent_id)?
                        .ok_or_else(|| RoutingError::PositionNotFound(parent_id.clone()))?;
                }
            }
        }

        Ok(chain)
    }

    /// Active persons occupying a position as of a given date.
    ///
    /// End-dated assignments and deactivated persons are excluded. The
    /// result is sorted by person id so downstream tie-breaks are
    /// deterministic regardless of storage iteration order.
    pub fn occupants_at(
        &self,
        position: &PositionId,
        as_of: NaiveDate,
    ) -> RoutingResult<Vec<Person>> {
        let mut occupants = Vec::new();
        let mut seen: HashSet<PersonId> = HashSet::new();

        for assignment in self.directory.assignments_to(position)? {
            if !assignment.is_current(as_of) {
                continue;
            }
            if !seen.insert(assignment.person_id.clone()) {
                continue;
            }
            if let Some(person) = self.directory.person(&assignment.person_id)? {
                if person.is_active {
                    occupants.push(person);
                }
            }
        }

        occupants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(occupants)
    }

    /// Active occupants as of today
    pub fn occupants(&self, position: &PositionId) -> RoutingResult<Vec<Person>> {
        self.occupants_at(position, Utc::now().date_naive())
    }

    /// The single position that anchors hierarchy resolution when a person
    /// holds several.
    ///
    /// Policy (a documented total order, not incidental storage order):
    /// among current assignments, the earliest `start_date` wins; undated
    /// assignments sort last; ties break on the lower position id.
    pub fn primary_position(&self, person: &PersonId) -> RoutingResult<Position> {
        let as_of = Utc::now().date_naive();
        let mut current: Vec<_> = self
            .directory
            .assignments_for(person)?
            .into_iter()
            .filter(|a| a.is_current(as_of))
            .collect();

        current.sort_by(|a, b| {
            match (a.start_date, b.start_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(|| a.position_id.cmp(&b.position_id))
        });

        let primary = current
            .first()
            .ok_or_else(|| RoutingError::NoPositionAssigned(person.clone()))?;

        self.directory
            .position(&primary.position_id)?
            .ok_or_else(|| RoutingError::PositionNotFound(primary.position_id.clone()))
    }
}

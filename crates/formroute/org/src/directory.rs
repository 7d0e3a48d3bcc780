//! Read-only access to organization data
//!
//! The resolver and router never touch storage directly; they query this
//! trait. The engine crate ships an in-memory implementation, and a durable
//! deployment can back the same queries with a database (the ancestor walk
//! itself stays in the resolver so a recursive query is an optimization,
//! never a requirement).

use formroute_types::{Assignment, Person, PersonId, Position, PositionId, RoutingResult};

/// Read-only organization queries used by hierarchy resolution
pub trait OrgDirectory: Send + Sync {
    /// Look up a position by id
    fn position(&self, id: &PositionId) -> RoutingResult<Option<Position>>;

    /// Look up a person by id
    fn person(&self, id: &PersonId) -> RoutingResult<Option<Person>>;

    /// All assignments held by a person, current or not
    fn assignments_for(&self, person: &PersonId) -> RoutingResult<Vec<Assignment>>;

    /// All assignments attached to a position, current or not
    fn assignments_to(&self, position: &PositionId) -> RoutingResult<Vec<Assignment>>;
}

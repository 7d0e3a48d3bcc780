//! Approver router: who must approve a given stage for a given submitter

use crate::{HierarchyResolver, OrgDirectory};
use formroute_types::{Person, PersonId, RoleTag, RoutingError, RoutingResult};
use std::sync::Arc;

/// Finds the person who must act on a stage by scanning the submitter's
/// reporting chain for the nearest ancestor carrying the required role.
#[derive(Clone, Debug)]
pub struct ApproverRouter<D: OrgDirectory> {
    resolver: HierarchyResolver<D>,
}

impl<D: OrgDirectory> ApproverRouter<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self {
            resolver: HierarchyResolver::new(directory),
        }
    }

    pub fn resolver(&self) -> &HierarchyResolver<D> {
        &self.resolver
    }

    /// Resolve the approver for `required_role` relative to `submitter`.
    ///
    /// The scan starts at the submitter's own primary position and walks
    /// upward, so a submitter whose position itself carries the role is
    /// their own approver (matching how self-managed positions behave in
    /// the org chart). When a matching position has several active
    /// occupants the lowest person id wins: a deliberate, stable policy
    /// rather than whatever order storage returned.
    ///
    /// Failure modes are distinct so callers can act on them:
    /// - [`RoutingError::NoPositionAssigned`]: submitter is unplaced;
    /// - [`RoutingError::ApproverRoleNotFound`]: the whole chain lacks the
    ///   role;
    /// - [`RoutingError::PositionVacant`]: the role exists but nobody
    ///   active holds that position.
    pub fn resolve_approver(
        &self,
        submitter: &PersonId,
        required_role: &RoleTag,
    ) -> RoutingResult<Person> {
        let anchor = self.resolver.primary_position(submitter)?;
        let chain = self.resolver.ancestor_chain(&anchor.id)?;

        for position in &chain {
            if position.role != *required_role {
                continue;
            }

            let occupants = self.resolver.occupants(&position.id)?;
            return match occupants.into_iter().next() {
                Some(person) => {
                    tracing::debug!(
                        submitter = %submitter,
                        role = %required_role,
                        position = %position.id,
                        approver = %person.id,
                        "approver resolved"
                    );
                    Ok(person)
                }
                None => Err(RoutingError::PositionVacant {
                    position: position.id.clone(),
                    title: position.title.clone(),
                }),
            };
        }

        Err(RoutingError::ApproverRoleNotFound {
            role: required_role.clone(),
        })
    }
}

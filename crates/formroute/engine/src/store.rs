//! Storage abstraction for the routing engine
//!
//! [`RoutingStore`] extends the org directory with the entities the engine
//! reads and writes: templates, workflows, submissions, and approval
//! requests. [`InMemoryStore`] is the reference implementation; a durable
//! store would put each engine transition inside one transaction, which the
//! engine's plan-before-commit discipline already assumes.

use formroute_org::OrgDirectory;
use formroute_types::{
    ApprovalRequest, Assignment, FormTemplate, Person, PersonId, Position, PositionId, RequestId,
    RoutingError, RoutingResult, Submission, SubmissionId, TemplateId, Workflow,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// Everything the routing engine needs from storage.
pub trait RoutingStore: OrgDirectory {
    fn template(&self, id: &TemplateId) -> RoutingResult<Option<FormTemplate>>;

    /// The workflow bound to a template, if any. At most one exists.
    fn workflow_for_template(&self, template: &TemplateId) -> RoutingResult<Option<Workflow>>;

    fn submission(&self, id: &SubmissionId) -> RoutingResult<Option<Submission>>;

    /// Insert or replace a submission by id
    fn put_submission(&self, submission: Submission) -> RoutingResult<()>;

    fn request(&self, id: &RequestId) -> RoutingResult<Option<ApprovalRequest>>;

    /// Insert or replace an approval request by id
    fn put_request(&self, request: ApprovalRequest) -> RoutingResult<()>;

    /// The pending request parked on a submission, if any. The engine
    /// maintains the invariant that there is at most one.
    fn pending_request_for_submission(
        &self,
        submission: &SubmissionId,
    ) -> RoutingResult<Option<ApprovalRequest>>;

    /// All pending requests assigned to one person, oldest first
    fn pending_requests_for(&self, assignee: &PersonId) -> RoutingResult<Vec<ApprovalRequest>>;
}

// ── In-memory store ──────────────────────────────────────────────────

/// Map-backed store for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryStore {
    persons: RwLock<HashMap<PersonId, Person>>,
    positions: RwLock<HashMap<PositionId, Position>>,
    assignments: RwLock<Vec<Assignment>>,
    templates: RwLock<HashMap<TemplateId, FormTemplate>>,
    workflows: RwLock<HashMap<TemplateId, Workflow>>,
    submissions: RwLock<HashMap<SubmissionId, Submission>>,
    requests: RwLock<HashMap<RequestId, ApprovalRequest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Seed helpers used by administration paths and tests.

    pub fn add_person(&self, person: Person) -> RoutingResult<()> {
        self.persons
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?
            .insert(person.id.clone(), person);
        Ok(())
    }

    pub fn add_position(&self, position: Position) -> RoutingResult<()> {
        self.positions
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?
            .insert(position.id.clone(), position);
        Ok(())
    }

    pub fn assign(&self, assignment: Assignment) -> RoutingResult<()> {
        self.assignments
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?
            .push(assignment);
        Ok(())
    }

    pub fn add_template(&self, template: FormTemplate) -> RoutingResult<()> {
        self.templates
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?
            .insert(template.id.clone(), template);
        Ok(())
    }

    /// Bind a workflow to its template. A template has at most one
    /// workflow; a second bind is rejected rather than silently replaced.
    pub fn add_workflow(&self, workflow: Workflow) -> RoutingResult<()> {
        let mut workflows = self
            .workflows
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?;
        if workflows.contains_key(&workflow.template_id) {
            return Err(RoutingError::WorkflowAlreadyBound(workflow.template_id));
        }
        workflows.insert(workflow.template_id.clone(), workflow);
        Ok(())
    }
}

impl OrgDirectory for InMemoryStore {
    fn position(&self, id: &PositionId) -> RoutingResult<Option<Position>> {
        Ok(self
            .positions
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    fn person(&self, id: &PersonId) -> RoutingResult<Option<Person>> {
        Ok(self
            .persons
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    fn assignments_for(&self, person: &PersonId) -> RoutingResult<Vec<Assignment>> {
        Ok(self
            .assignments
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .iter()
            .filter(|a| &a.person_id == person)
            .cloned()
            .collect())
    }

    fn assignments_to(&self, position: &PositionId) -> RoutingResult<Vec<Assignment>> {
        Ok(self
            .assignments
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .iter()
            .filter(|a| &a.position_id == position)
            .cloned()
            .collect())
    }
}

impl RoutingStore for InMemoryStore {
    fn template(&self, id: &TemplateId) -> RoutingResult<Option<FormTemplate>> {
        Ok(self
            .templates
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    fn workflow_for_template(&self, template: &TemplateId) -> RoutingResult<Option<Workflow>> {
        Ok(self
            .workflows
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .get(template)
            .cloned())
    }

    fn submission(&self, id: &SubmissionId) -> RoutingResult<Option<Submission>> {
        Ok(self
            .submissions
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    fn put_submission(&self, submission: Submission) -> RoutingResult<()> {
        self.submissions
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?
            .insert(submission.id.clone(), submission);
        Ok(())
    }

    fn request(&self, id: &RequestId) -> RoutingResult<Option<ApprovalRequest>> {
        Ok(self
            .requests
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .get(id)
            .cloned())
    }

    fn put_request(&self, request: ApprovalRequest) -> RoutingResult<()> {
        self.requests
            .write()
            .map_err(|_| RoutingError::LockPoisoned)?
            .insert(request.id.clone(), request);
        Ok(())
    }

    fn pending_request_for_submission(
        &self,
        submission: &SubmissionId,
    ) -> RoutingResult<Option<ApprovalRequest>> {
        Ok(self
            .requests
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .values()
            .find(|r| &r.submission_id == submission && r.is_pending())
            .cloned())
    }

    fn pending_requests_for(&self, assignee: &PersonId) -> RoutingResult<Vec<ApprovalRequest>> {
        let mut pending: Vec<ApprovalRequest> = self
            .requests
            .read()
            .map_err(|_| RoutingError::LockPoisoned)?
            .values()
            .filter(|r| &r.assignee == assignee && r.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formroute_types::StageId;
    use serde_json::json;

    #[test]
    fn test_workflow_binding_is_exclusive() {
        let store = InMemoryStore::new();
        let template = TemplateId::new("tmpl-1");
        store
            .add_template(FormTemplate::new(template.clone(), "Leave"))
            .unwrap();
        store
            .add_workflow(Workflow::new(template.clone(), "Leave v1"))
            .unwrap();

        let err = store
            .add_workflow(Workflow::new(template.clone(), "Leave v2"))
            .unwrap_err();
        assert!(matches!(err, RoutingError::WorkflowAlreadyBound(_)));
        assert_eq!(
            store.workflow_for_template(&template).unwrap().unwrap().name,
            "Leave v1"
        );
    }

    #[test]
    fn test_pending_request_queries() {
        let store = InMemoryStore::new();
        let bob = PersonId::new("bob");
        let sub = SubmissionId::new("sub-1");

        let mut decided = ApprovalRequest::new(sub.clone(), StageId::new("s1"), bob.clone());
        decided.approve(None);
        store.put_request(decided).unwrap();

        let pending = ApprovalRequest::new(sub.clone(), StageId::new("s2"), bob.clone());
        let pending_id = pending.id.clone();
        store.put_request(pending).unwrap();

        let found = store.pending_request_for_submission(&sub).unwrap().unwrap();
        assert_eq!(found.id, pending_id);

        let inbox = store.pending_requests_for(&bob).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, pending_id);
    }

    #[test]
    fn test_put_submission_replaces_by_id() {
        let store = InMemoryStore::new();
        let mut sub = Submission::new(
            TemplateId::new("tmpl-1"),
            PersonId::new("alice"),
            json!({"amount": 500}),
            false,
        );
        store.put_submission(sub.clone()).unwrap();

        sub.route_to(StageId::new("s1"));
        store.put_submission(sub.clone()).unwrap();

        let stored = store.submission(&sub.id).unwrap().unwrap();
        assert_eq!(stored.current_stage, Some(StageId::new("s1")));
    }
}

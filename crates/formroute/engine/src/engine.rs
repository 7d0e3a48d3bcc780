//! The routing engine: submissions in, decisions applied, audit out
//!
//! Every public operation is one atomic transition. The engine plans all
//! fallible work (reads, condition evaluation, approver resolution) before
//! its first write, so an error reported to the caller means stored state
//! did not change. Decisions on the same submission are serialized through
//! a per-submission lock; the loser of a race re-reads the request and
//! observes it already decided.

use crate::{CompletionNotice, CompletionSink, ConditionEvaluator, NullSink, RoutingStore};
use formroute_ledger::AuditLedger;
use formroute_org::ApproverRouter;
use formroute_types::{
    ApprovalRequest, AuditAction, AuditEntry, DecisionAction, EntityKind, Person, PersonId,
    RequestId, RoutingError, RoutingResult, Stage, Submission, SubmissionId, TemplateId, Workflow,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ── Per-submission lock registry ─────────────────────────────────────

/// One mutex per submission, created on first use. Serializes the
/// read-modify-write window of `decide` so concurrent decisions cannot
/// both observe the same request as pending.
#[derive(Default)]
struct SubmissionLocks {
    inner: Mutex<HashMap<SubmissionId, Arc<Mutex<()>>>>,
}

impl SubmissionLocks {
    fn lock_for(&self, id: &SubmissionId) -> RoutingResult<Arc<Mutex<()>>> {
        let mut map = self.inner.lock().map_err(|_| RoutingError::LockPoisoned)?;
        Ok(Arc::clone(map.entry(id.clone()).or_default()))
    }

    /// Drop the entry for a submission that can no longer transition.
    /// Late losers of a race still hold their `Arc` clone and, once they
    /// run, re-read the request and find it decided.
    fn release(&self, id: &SubmissionId) -> RoutingResult<()> {
        self.inner
            .lock()
            .map_err(|_| RoutingError::LockPoisoned)?
            .remove(id);
        Ok(())
    }
}

// ── Advance plan ─────────────────────────────────────────────────────

/// The outcome of scanning the remaining stages: either the submission
/// parks on a stage with a resolved approver, or no stage applies and it
/// completes. Computed fully before anything is written.
enum AdvancePlan {
    Route { stage: Stage, approver: Person },
    Complete,
}

// ── Routing engine ───────────────────────────────────────────────────

/// Drives submissions through their workflows.
pub struct RoutingEngine<S: RoutingStore> {
    store: Arc<S>,
    router: ApproverRouter<S>,
    ledger: Arc<AuditLedger>,
    sink: Arc<dyn CompletionSink>,
    locks: SubmissionLocks,
}

impl<S: RoutingStore> RoutingEngine<S> {
    pub fn new(store: Arc<S>, ledger: Arc<AuditLedger>) -> Self {
        Self {
            router: ApproverRouter::new(Arc::clone(&store)),
            store,
            ledger,
            sink: Arc::new(NullSink),
            locks: SubmissionLocks::default(),
        }
    }

    /// Replace the completion sink (defaults to [`NullSink`])
    pub fn with_sink(mut self, sink: Arc<dyn CompletionSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    /// Create a submission against a template.
    ///
    /// A draft is persisted without routing. A non-draft submission is
    /// immediately routed to the first applicable stage; if no stage
    /// applies it completes at once. When routing cannot produce a plan
    /// (missing workflow, unresolvable approver) nothing is persisted and
    /// the error is returned.
    pub fn submit_new(
        &self,
        template_id: &TemplateId,
        submitter: &PersonId,
        form_data: Value,
        is_draft: bool,
    ) -> RoutingResult<Submission> {
        let template = self
            .store
            .template(template_id)?
            .ok_or_else(|| RoutingError::TemplateNotFound(template_id.clone()))?;
        if !template.is_active {
            return Err(RoutingError::TemplateInactive(template_id.clone()));
        }

        let mut submission =
            Submission::new(template_id.clone(), submitter.clone(), form_data, is_draft);

        if is_draft {
            self.store.put_submission(submission.clone())?;
            self.ledger.record(
                submission.id.0.clone(),
                EntityKind::Submission,
                AuditAction::DraftSaved,
                Some(submitter.clone()),
                None,
            )?;
            tracing::info!(
                submission = %submission.id.short(),
                submitter = %submitter,
                "draft saved"
            );
            return Ok(submission);
        }

        let workflow = self
            .store
            .workflow_for_template(template_id)?
            .ok_or_else(|| RoutingError::NoWorkflowConfigured(template_id.clone()))?;

        let plan = self.plan_advance(&workflow, &submission.form_data, 0, submitter)?;

        self.store.put_submission(submission.clone())?;
        self.ledger.record(
            submission.id.0.clone(),
            EntityKind::Submission,
            AuditAction::Submitted,
            Some(submitter.clone()),
            None,
        )?;
        self.commit_advance(&mut submission, plan)?;
        Ok(submission)
    }

    /// Apply one decision to a pending approval request and return the
    /// updated submission.
    ///
    /// Approval advances the submission to the next applicable stage, or
    /// completes it when none remains. Rejection terminates the workflow.
    /// On a resolution failure the request stays pending and the decision
    /// can be retried once the org data is fixed.
    pub fn decide(
        &self,
        request_id: &RequestId,
        actor: &PersonId,
        action: DecisionAction,
        comments: Option<String>,
    ) -> RoutingResult<Submission> {
        // First read only locates the submission; validity is re-checked
        // under the lock.
        let located = self
            .store
            .request(request_id)?
            .ok_or_else(|| RoutingError::RequestNotFound(request_id.clone()))?;
        let lock = self.locks.lock_for(&located.submission_id)?;
        let _guard = lock.lock().map_err(|_| RoutingError::LockPoisoned)?;

        let mut request = self
            .store
            .request(request_id)?
            .ok_or_else(|| RoutingError::RequestNotFound(request_id.clone()))?;
        if !request.is_pending() {
            return Err(RoutingError::RequestAlreadyDecided(request.id));
        }
        if &request.assignee != actor {
            return Err(RoutingError::NotAuthorized(actor.clone()));
        }

        let mut submission = self
            .store
            .submission(&request.submission_id)?
            .ok_or_else(|| RoutingError::SubmissionNotFound(request.submission_id.clone()))?;
        if submission.is_terminal() {
            return Err(RoutingError::SubmissionTerminal(submission.id));
        }

        match action {
            DecisionAction::Reject => {
                request.reject(comments.clone());
                self.store.put_request(request.clone())?;

                submission.reject();
                self.store.put_submission(submission.clone())?;
                self.ledger.record(
                    submission.id.0.clone(),
                    EntityKind::Submission,
                    AuditAction::Rejected,
                    Some(actor.clone()),
                    Some(json!({ "stage": request.stage_id.clone(), "comments": comments })),
                )?;
                tracing::info!(
                    submission = %submission.id.short(),
                    stage = %request.stage_id,
                    actor = %actor,
                    "submission rejected"
                );
                self.locks.release(&submission.id)?;
                Ok(submission)
            }
            DecisionAction::Approve => {
                let workflow = self
                    .store
                    .workflow_for_template(&submission.template_id)?
                    .ok_or_else(|| {
                        RoutingError::NoWorkflowConfigured(submission.template_id.clone())
                    })?;
                let index = workflow
                    .stage_index(&request.stage_id)
                    .ok_or_else(|| RoutingError::StageNotInWorkflow(request.stage_id.clone()))?;

                // Plan the advance before touching the request: a failure
                // here must leave the decision retryable.
                let plan = match self.plan_advance(
                    &workflow,
                    &submission.form_data,
                    index + 1,
                    &submission.submitter,
                ) {
                    Ok(plan) => plan,
                    Err(err) => {
                        if err.is_resolution_failure() {
                            tracing::warn!(
                                submission = %submission.id.short(),
                                error = %err,
                                "next approver unresolvable; decision not applied"
                            );
                        } else {
                            tracing::error!(
                                submission = %submission.id.short(),
                                error = %err,
                                "routing misconfiguration"
                            );
                        }
                        return Err(err);
                    }
                };

                request.approve(comments.clone());
                self.store.put_request(request.clone())?;
                self.ledger.record(
                    submission.id.0.clone(),
                    EntityKind::Submission,
                    AuditAction::Approved,
                    Some(actor.clone()),
                    Some(json!({ "stage": request.stage_id.clone(), "comments": comments })),
                )?;
                self.commit_advance(&mut submission, plan)?;
                if submission.is_terminal() {
                    self.locks.release(&submission.id)?;
                }
                Ok(submission)
            }
        }
    }

    /// A person's pending inbox, oldest request first
    pub fn pending_approvals_for(&self, assignee: &PersonId) -> RoutingResult<Vec<ApprovalRequest>> {
        self.store.pending_requests_for(assignee)
    }

    pub fn submission(&self, id: &SubmissionId) -> RoutingResult<Submission> {
        self.store
            .submission(id)?
            .ok_or_else(|| RoutingError::SubmissionNotFound(id.clone()))
    }

    /// The audit timeline of a submission, oldest entry first
    pub fn timeline(&self, id: &SubmissionId) -> RoutingResult<Vec<AuditEntry>> {
        if self.store.submission(id)?.is_none() {
            return Err(RoutingError::SubmissionNotFound(id.clone()));
        }
        self.ledger.timeline(&id.0, EntityKind::Submission)
    }

    /// Scan stages from `start` for the first whose conditions apply, and
    /// resolve its approver. No writes happen here.
    fn plan_advance(
        &self,
        workflow: &Workflow,
        form_data: &Value,
        start: usize,
        submitter: &PersonId,
    ) -> RoutingResult<AdvancePlan> {
        for stage in workflow.stages().iter().skip(start) {
            if !ConditionEvaluator::applies(&stage.conditions, form_data) {
                tracing::debug!(stage = %stage.id, "stage skipped, conditions not met");
                continue;
            }
            let approver = self.router.resolve_approver(submitter, &stage.required_role)?;
            return Ok(AdvancePlan::Route {
                stage: stage.clone(),
                approver,
            });
        }
        Ok(AdvancePlan::Complete)
    }

    /// Apply a plan: park the submission on its stage with a fresh request,
    /// or complete it and notify the sink.
    fn commit_advance(
        &self,
        submission: &mut Submission,
        plan: AdvancePlan,
    ) -> RoutingResult<()> {
        match plan {
            AdvancePlan::Route { stage, approver } => {
                // At most one pending request per submission, ever.
                if self
                    .store
                    .pending_request_for_submission(&submission.id)?
                    .is_some()
                {
                    return Err(RoutingError::PendingRequestExists(submission.id.clone()));
                }

                submission.route_to(stage.id.clone());
                self.store.put_submission(submission.clone())?;

                let request =
                    ApprovalRequest::new(submission.id.clone(), stage.id.clone(), approver.id.clone());
                self.store.put_request(request)?;
                tracing::info!(
                    submission = %submission.id.short(),
                    stage = %stage.id,
                    assignee = %approver.id,
                    "submission routed"
                );
            }
            AdvancePlan::Complete => {
                submission.complete();
                self.store.put_submission(submission.clone())?;
                self.ledger.record(
                    submission.id.0.clone(),
                    EntityKind::Submission,
                    AuditAction::Completed,
                    None,
                    Some(submission.form_data.clone()),
                )?;

                let notice = CompletionNotice {
                    submission_id: submission.id.clone(),
                    template_id: submission.template_id.clone(),
                    submitter: submission.submitter.clone(),
                    form_data: submission.form_data.clone(),
                    timeline: self
                        .ledger
                        .timeline(&submission.id.0, EntityKind::Submission)?,
                    completed_at: submission.updated_at,
                };
                // Completion is already committed; a failing sink is
                // reported, never propagated.
                if let Err(err) = self.sink.submission_completed(&notice) {
                    tracing::warn!(
                        submission = %submission.id.short(),
                        error = %err,
                        "completion notification failed"
                    );
                }
                tracing::info!(submission = %submission.id.short(), "submission completed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryStore, RecordingSink};
    use formroute_types::{
        Assignment, ConditionSet, FormTemplate, Person, Position, PositionId, RoleTag,
        SubmissionStatus,
    };

    struct Fixture {
        engine: RoutingEngine<InMemoryStore>,
        store: Arc<InMemoryStore>,
        sink: Arc<RecordingSink>,
    }

    const TEMPLATE: &str = "tmpl-expense";

    /// alice (USER) reports to bob (MANAGER) reports to carol (HOD).
    /// Workflow: stage 10 needs MANAGER, stage 20 needs HOD when
    /// amount > 1000.
    fn make_fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());

        let root = Position::new(PositionId::new("root"), "Head of Dept", RoleTag::new("HOD"));
        let mid = Position::new(PositionId::new("mid"), "Manager", RoleTag::new("MANAGER"))
            .with_parent(PositionId::new("root"));
        let leaf = Position::new(PositionId::new("leaf"), "Engineer", RoleTag::new("USER"))
            .with_parent(PositionId::new("mid"));
        for p in [root, mid, leaf] {
            store.add_position(p).unwrap();
        }
        for (name, position) in [("carol", "root"), ("bob", "mid"), ("alice", "leaf")] {
            let id = PersonId::new(name);
            store
                .add_person(Person::new(id.clone(), format!("{name}@example.com"), name))
                .unwrap();
            store
                .assign(Assignment::new(id, PositionId::new(position)))
                .unwrap();
        }

        let template_id = TemplateId::new(TEMPLATE);
        store
            .add_template(FormTemplate::new(template_id.clone(), "Expense Claim"))
            .unwrap();

        let mut workflow = Workflow::new(template_id, "Expense Approval");
        workflow
            .add_stage(Stage::new(workflow.id.clone(), 10, RoleTag::new("MANAGER")))
            .unwrap();
        let conditions = ConditionSet::parse(&json!({"amount": {">": 1000}})).unwrap();
        workflow
            .add_stage(
                Stage::new(workflow.id.clone(), 20, RoleTag::new("HOD"))
                    .with_conditions(conditions),
            )
            .unwrap();
        store.add_workflow(workflow).unwrap();

        let sink = Arc::new(RecordingSink::new());
        let engine = RoutingEngine::new(Arc::clone(&store), Arc::new(AuditLedger::new()))
            .with_sink(Arc::clone(&sink) as Arc<dyn CompletionSink>);
        Fixture { engine, store, sink }
    }

    fn submit(fixture: &Fixture, amount: i64) -> Submission {
        fixture
            .engine
            .submit_new(
                &TemplateId::new(TEMPLATE),
                &PersonId::new("alice"),
                json!({ "amount": amount }),
                false,
            )
            .unwrap()
    }

    fn only_pending(fixture: &Fixture, person: &str) -> ApprovalRequest {
        let mut inbox = fixture
            .engine
            .pending_approvals_for(&PersonId::new(person))
            .unwrap();
        assert_eq!(inbox.len(), 1, "expected exactly one pending request");
        inbox.remove(0)
    }

    fn actions(fixture: &Fixture, id: &SubmissionId) -> Vec<AuditAction> {
        fixture
            .engine
            .timeline(id)
            .unwrap()
            .iter()
            .map(|e| e.action)
            .collect()
    }

    #[test]
    fn test_draft_is_saved_without_routing() {
        let fixture = make_fixture();
        let draft = fixture
            .engine
            .submit_new(
                &TemplateId::new(TEMPLATE),
                &PersonId::new("alice"),
                json!({"amount": 5000}),
                true,
            )
            .unwrap();

        assert_eq!(draft.status, SubmissionStatus::Draft);
        assert!(draft.current_stage.is_none());
        assert!(fixture
            .engine
            .pending_approvals_for(&PersonId::new("bob"))
            .unwrap()
            .is_empty());
        assert_eq!(actions(&fixture, &draft.id), vec![AuditAction::DraftSaved]);
    }

    #[test]
    fn test_small_amount_skips_conditional_stage() {
        let fixture = make_fixture();
        let submission = submit(&fixture, 500);

        let request = only_pending(&fixture, "bob");
        fixture
            .engine
            .decide(&request.id, &PersonId::new("bob"), DecisionAction::Approve, None)
            .unwrap();

        let stored = fixture.engine.submission(&submission.id).unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
        assert!(fixture
            .engine
            .pending_approvals_for(&PersonId::new("carol"))
            .unwrap()
            .is_empty());

        let notices = fixture.sink.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].submission_id, submission.id);
        assert_eq!(notices[0].form_data, json!({"amount": 500}));
        assert_eq!(
            notices[0].timeline.last().map(|e| e.action),
            Some(AuditAction::Completed)
        );
    }

    #[test]
    fn test_large_amount_walks_both_stages() {
        let fixture = make_fixture();
        let submission = submit(&fixture, 5000);

        let first = only_pending(&fixture, "bob");
        fixture
            .engine
            .decide(&first.id, &PersonId::new("bob"), DecisionAction::Approve, None)
            .unwrap();

        let second = only_pending(&fixture, "carol");
        assert_ne!(first.stage_id, second.stage_id);
        fixture
            .engine
            .decide(
                &second.id,
                &PersonId::new("carol"),
                DecisionAction::Approve,
                Some("within budget".into()),
            )
            .unwrap();

        let stored = fixture.engine.submission(&submission.id).unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
        assert_eq!(
            actions(&fixture, &submission.id),
            vec![
                AuditAction::Submitted,
                AuditAction::Approved,
                AuditAction::Approved,
                AuditAction::Completed,
            ]
        );
        assert_eq!(fixture.sink.take().len(), 1);
    }

    #[test]
    fn test_rejection_short_circuits() {
        let fixture = make_fixture();
        let submission = submit(&fixture, 5000);

        let request = only_pending(&fixture, "bob");
        fixture
            .engine
            .decide(
                &request.id,
                &PersonId::new("bob"),
                DecisionAction::Reject,
                Some("no receipts".into()),
            )
            .unwrap();

        let stored = fixture.engine.submission(&submission.id).unwrap();
        assert_eq!(stored.status, SubmissionStatus::Rejected);
        assert!(stored.current_stage.is_none());
        assert!(fixture
            .engine
            .pending_approvals_for(&PersonId::new("carol"))
            .unwrap()
            .is_empty());
        assert_eq!(
            actions(&fixture, &submission.id),
            vec![AuditAction::Submitted, AuditAction::Rejected]
        );
        assert!(fixture.sink.take().is_empty());
    }

    #[test]
    fn test_second_decision_is_rejected() {
        let fixture = make_fixture();
        let submission = submit(&fixture, 500);

        let request = only_pending(&fixture, "bob");
        fixture
            .engine
            .decide(&request.id, &PersonId::new("bob"), DecisionAction::Approve, None)
            .unwrap();

        let err = fixture
            .engine
            .decide(&request.id, &PersonId::new("bob"), DecisionAction::Reject, None)
            .unwrap_err();
        assert!(matches!(err, RoutingError::RequestAlreadyDecided(_)));

        // The late rejection changed nothing.
        let stored = fixture.engine.submission(&submission.id).unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
    }

    #[test]
    fn test_only_the_assignee_may_decide() {
        let fixture = make_fixture();
        submit(&fixture, 500);

        let request = only_pending(&fixture, "bob");
        let err = fixture
            .engine
            .decide(&request.id, &PersonId::new("carol"), DecisionAction::Approve, None)
            .unwrap_err();
        assert!(matches!(err, RoutingError::NotAuthorized(_)));
        assert!(err.is_caller_error());

        // Still pending for the real assignee.
        assert_eq!(only_pending(&fixture, "bob").id, request.id);
    }

    #[test]
    fn test_missing_workflow_persists_nothing() {
        let fixture = make_fixture();
        let bare = TemplateId::new("tmpl-bare");
        fixture
            .store
            .add_template(FormTemplate::new(bare.clone(), "No Workflow"))
            .unwrap();

        let err = fixture
            .engine
            .submit_new(&bare, &PersonId::new("alice"), json!({"amount": 1}), false)
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoWorkflowConfigured(_)));
        assert!(fixture.engine.ledger().is_empty().unwrap());
        assert!(fixture
            .engine
            .pending_approvals_for(&PersonId::new("bob"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_inactive_template_rejected() {
        let fixture = make_fixture();
        let retired = TemplateId::new("tmpl-retired");
        fixture
            .store
            .add_template(FormTemplate::new(retired.clone(), "Old Form").retired())
            .unwrap();

        let err = fixture
            .engine
            .submit_new(&retired, &PersonId::new("alice"), json!({}), false)
            .unwrap_err();
        assert!(matches!(err, RoutingError::TemplateInactive(_)));

        let err = fixture
            .engine
            .submit_new(
                &TemplateId::new("tmpl-ghost"),
                &PersonId::new("alice"),
                json!({}),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, RoutingError::TemplateNotFound(_)));
    }

    #[test]
    fn test_unresolvable_approver_keeps_decision_retryable() {
        let fixture = make_fixture();
        // Carol is on leave of absence: the HOD seat has no active occupant.
        let carol = PersonId::new("carol");
        fixture
            .store
            .add_person(Person::new(carol.clone(), "carol@example.com", "carol").deactivated())
            .unwrap();

        let submission = submit(&fixture, 5000);
        let request = only_pending(&fixture, "bob");

        let err = fixture
            .engine
            .decide(&request.id, &PersonId::new("bob"), DecisionAction::Approve, None)
            .unwrap_err();
        assert!(matches!(err, RoutingError::PositionVacant { .. }));

        // Nothing moved: the request is still pending on stage one.
        let stored = fixture.engine.submission(&submission.id).unwrap();
        assert_eq!(stored.status, SubmissionStatus::Pending);
        assert_eq!(stored.current_stage, Some(request.stage_id.clone()));
        assert_eq!(only_pending(&fixture, "bob").id, request.id);

        // Carol returns; the same decision now succeeds.
        fixture
            .store
            .add_person(Person::new(carol, "carol@example.com", "carol"))
            .unwrap();
        fixture
            .engine
            .decide(&request.id, &PersonId::new("bob"), DecisionAction::Approve, None)
            .unwrap();
        assert_eq!(only_pending(&fixture, "carol").submission_id, submission.id);
    }

    #[test]
    fn test_no_applicable_stage_completes_at_submit() {
        let fixture = make_fixture();
        let template_id = TemplateId::new("tmpl-auto");
        fixture
            .store
            .add_template(FormTemplate::new(template_id.clone(), "Auto Approve"))
            .unwrap();
        let mut workflow = Workflow::new(template_id.clone(), "Conditional Only");
        let conditions = ConditionSet::parse(&json!({"amount": {">": 1000}})).unwrap();
        workflow
            .add_stage(
                Stage::new(workflow.id.clone(), 10, RoleTag::new("MANAGER"))
                    .with_conditions(conditions),
            )
            .unwrap();
        fixture.store.add_workflow(workflow).unwrap();

        let submission = fixture
            .engine
            .submit_new(&template_id, &PersonId::new("alice"), json!({"amount": 10}), false)
            .unwrap();

        assert_eq!(submission.status, SubmissionStatus::Completed);
        assert_eq!(
            actions(&fixture, &submission.id),
            vec![AuditAction::Submitted, AuditAction::Completed]
        );
        let notices = fixture.sink.take();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].submitter, PersonId::new("alice"));
    }

    #[test]
    fn test_inbox_spans_submissions() {
        let fixture = make_fixture();
        let first = submit(&fixture, 100);
        let second = submit(&fixture, 200);

        let inbox = fixture
            .engine
            .pending_approvals_for(&PersonId::new("bob"))
            .unwrap();
        let submissions: Vec<&SubmissionId> = inbox.iter().map(|r| &r.submission_id).collect();
        assert_eq!(inbox.len(), 2);
        assert!(submissions.contains(&&first.id));
        assert!(submissions.contains(&&second.id));
    }

    fn lock_entries(fixture: &Fixture) -> usize {
        fixture.engine.locks.inner.lock().unwrap().len()
    }

    #[test]
    fn test_lock_registry_evicted_on_terminal_state() {
        let fixture = make_fixture();
        let submission = submit(&fixture, 5000);

        let first = only_pending(&fixture, "bob");
        fixture
            .engine
            .decide(&first.id, &PersonId::new("bob"), DecisionAction::Approve, None)
            .unwrap();
        // Still pending on stage two, so the entry stays.
        assert_eq!(lock_entries(&fixture), 1);

        let second = only_pending(&fixture, "carol");
        fixture
            .engine
            .decide(&second.id, &PersonId::new("carol"), DecisionAction::Approve, None)
            .unwrap();
        assert_eq!(lock_entries(&fixture), 0);

        // Rejection evicts too.
        submit(&fixture, 100);
        let request = only_pending(&fixture, "bob");
        fixture
            .engine
            .decide(&request.id, &PersonId::new("bob"), DecisionAction::Reject, None)
            .unwrap();
        assert_eq!(lock_entries(&fixture), 0);
        let stored = fixture.engine.submission(&submission.id).unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
    }

    #[test]
    fn test_concurrent_decisions_have_one_winner() {
        let fixture = make_fixture();
        let submission = submit(&fixture, 5000);
        let request = only_pending(&fixture, "bob");

        let engine = &fixture.engine;
        let results: Vec<RoutingResult<Submission>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let request_id = request.id.clone();
                    scope.spawn(move || {
                        engine.decide(
                            &request_id,
                            &PersonId::new("bob"),
                            DecisionAction::Approve,
                            None,
                        )
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, RoutingError::RequestAlreadyDecided(_))));

        // Exactly one stage-two request exists.
        assert_eq!(only_pending(&fixture, "carol").submission_id, submission.id);
        assert_eq!(
            actions(&fixture, &submission.id),
            vec![AuditAction::Submitted, AuditAction::Approved]
        );
    }
}

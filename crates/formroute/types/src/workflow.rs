//! Workflow templates: ordered, conditionally-applicable approval stages
//!
//! A workflow is bound to exactly one form template; a template has zero or
//! one workflow. A template without a workflow cannot accept non-draft
//! submissions.

use crate::{ConditionSet, RoleTag, RoutingError, RoutingResult, StageId, TemplateId, WorkflowId};
use serde::{Deserialize, Serialize};

// ── Form Template ────────────────────────────────────────────────────

/// A form template that submissions are instances of
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
}

impl FormTemplate {
    pub fn new(id: TemplateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn retired(mut self) -> Self {
        self.is_active = false;
        self
    }
}

// ── Stage ────────────────────────────────────────────────────────────

/// One ordered approval step in a workflow.
///
/// `order` defines traversal order within the workflow: ascending, unique,
/// gaps allowed. The conditions decide whether the stage applies to a given
/// submission; an empty set always applies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub workflow_id: WorkflowId,
    pub order: u32,
    pub required_role: RoleTag,
    #[serde(default, skip_serializing_if = "ConditionSet::is_empty")]
    pub conditions: ConditionSet,
}

impl Stage {
    pub fn new(workflow_id: WorkflowId, order: u32, required_role: RoleTag) -> Self {
        Self {
            id: StageId::generate(),
            workflow_id,
            order,
            required_role,
            conditions: ConditionSet::empty(),
        }
    }

    pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
        self.conditions = conditions;
        self
    }
}

// ── Workflow ─────────────────────────────────────────────────────────

/// An ordered template of stages bound to one form template
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub template_id: TemplateId,
    pub name: String,
    /// Stages kept sorted ascending by `order`
    stages: Vec<Stage>,
}

impl Workflow {
    pub fn new(template_id: TemplateId, name: impl Into<String>) -> Self {
        Self {
            id: WorkflowId::generate(),
            template_id,
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Add a stage, keeping the list sorted by order.
    ///
    /// A duplicate order within the same workflow is a configuration error:
    /// traversal order would be undefined.
    pub fn add_stage(&mut self, stage: Stage) -> RoutingResult<&Stage> {
        if self.stages.iter().any(|s| s.order == stage.order) {
            return Err(RoutingError::DuplicateStageOrder {
                workflow: self.id.clone(),
                order: stage.order,
            });
        }
        let index = self.stages.partition_point(|s| s.order < stage.order);
        self.stages.insert(index, stage);
        Ok(&self.stages[index])
    }

    /// Stages in ascending traversal order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| &s.id == id)
    }

    /// Index of a stage in traversal order
    pub fn stage_index(&self, id: &StageId) -> Option<usize> {
        self.stages.iter().position(|s| &s.id == id)
    }
}

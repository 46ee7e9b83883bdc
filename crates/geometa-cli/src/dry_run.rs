use crate::output::OutputWriter;
use geometa_core::models::ArtifactKind;
use geometa_core::GenerationPlan;
use serde::Serialize;
use std::path::Path;

/// Represents a planned action in dry-run mode
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub action_type: ActionType,
    pub description: String,
    pub details: Vec<String>,
}

/// Types of actions that can be planned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateDirectory,
    CreateFile,
    WriteFile,
}

impl PlannedAction {
    /// Create a new planned action
    pub fn new(action_type: ActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Add a detail to the planned action
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

/// Writes one generation run would perform
pub fn generation_actions(dataset: &Path, plan: &GenerationPlan) -> Vec<PlannedAction> {
    let mut actions = Vec::new();

    let dir = plan.paths.directory();
    if !dir.exists() {
        actions.push(PlannedAction::new(
            ActionType::CreateDirectory,
            format!("Create output directory {}", dir.display()),
        ));
    }

    for kind in ArtifactKind::ALL {
        let path = plan.paths.path(kind);
        let action_type = if path.exists() { ActionType::WriteFile } else { ActionType::CreateFile };
        actions.push(
            PlannedAction::new(action_type, format!("Write {} {}", kind, path.display()))
                .with_detail(format!("Dataset: {}", dataset.display()))
                .with_detail(format!("Type: {}", plan.dataset_type)),
        );
    }

    actions
}

/// Display planned actions in dry-run mode
pub fn display_planned_actions(output: &OutputWriter, actions: &[PlannedAction]) -> anyhow::Result<()> {
    if output.is_json() {
        return output.result(serde_json::json!({
            "dry_run": true,
            "planned_actions": actions,
        }));
    }

    output.section("Planned Actions (Dry Run)");
    for (i, action) in actions.iter().enumerate() {
        output.info(format!("{}. {:?}: {}", i + 1, action.action_type, action.description));
        for detail in &action.details {
            output.info(format!("   - {}", detail));
        }
    }
    output.info("No changes were made. Run without --dry-run to execute these actions.");
    Ok(())
}

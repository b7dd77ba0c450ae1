use crate::errors::{GenesisError, Result};
use crate::prompt;
use crate::provider::Provider;
use crate::structured::{parse_validated, validate_design_plan};
use crate::wire::{design_plan_schema, CompletionRequest, UIDesignPlan};

pub const STAGE: &str = "design";

/// Design a UI for the given features. Only the feature list is visible to
/// this stage, never the product name or audience.
pub async fn run(provider: &dyn Provider, mvp_features: &[String]) -> Result<UIDesignPlan> {
    let features_json = serde_json::to_string(mvp_features)
        .map_err(|e| GenesisError::structured(STAGE, format!("could not serialize features: {e}")))?;
    let schema = design_plan_schema();
    let req = CompletionRequest::structured(
        STAGE,
        prompt::system_prompt_design(&schema),
        prompt::user_prompt_design(&features_json),
        schema,
    );
    let raw = provider.complete(&req).await?;
    parse_validated(STAGE, &raw, |plan: &UIDesignPlan| validate_design_plan(plan, mvp_features.len()))
}

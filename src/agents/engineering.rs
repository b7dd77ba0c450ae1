use crate::errors::{GenesisError, Result};
use crate::fence::strip_code_fences;
use crate::prompt;
use crate::provider::Provider;
use crate::wire::{CompletionRequest, ProductPlan, UIDesignPlan};

pub const STAGE: &str = "engineering";

/// Generate the single-file Streamlit source for both plans. Free-form
/// output, so the only post-processing is fence stripping. A reply with no
/// code left after stripping fails the stage.
pub async fn run(provider: &dyn Provider, product: &ProductPlan, design: &UIDesignPlan) -> Result<String> {
    let req = CompletionRequest::text(
        STAGE,
        prompt::system_prompt_engineering(),
        prompt::user_prompt_engineering(product, design),
    );
    let raw = provider.complete(&req).await?;
    let code = strip_code_fences(&raw);
    if code.is_empty() {
        return Err(GenesisError::provider("engineering stage returned no code"));
    }
    Ok(code)
}

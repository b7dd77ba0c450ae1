use crate::errors::Result;
use crate::prompt;
use crate::provider::Provider;
use crate::structured::{parse_validated, validate_product_plan};
use crate::wire::{product_plan_schema, CompletionRequest, ProductPlan};

pub const STAGE: &str = "product";

/// Turn a raw idea into a [`ProductPlan`]. Not retried on bad output.
pub async fn run(provider: &dyn Provider, idea: &str) -> Result<ProductPlan> {
    let schema = product_plan_schema();
    let req = CompletionRequest::structured(
        STAGE,
        prompt::system_prompt_product(&schema),
        prompt::user_prompt_product(idea),
        schema,
    );
    let raw = provider.complete(&req).await?;
    parse_validated(STAGE, &raw, validate_product_plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::fixtures;
    use crate::errors::GenesisError;
    use crate::provider::scripted::ScriptedProvider;

    #[tokio::test]
    async fn parses_plan_and_sends_idea() {
        let p = ScriptedProvider::new([fixtures::PRODUCT_JSON]);
        let plan = run(&p, "A cafe shop in Chandigarh.").await.unwrap();
        assert_eq!(plan, fixtures::product_plan());

        let reqs = p.requests();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].stage, STAGE);
        assert!(reqs[0].user.contains("A cafe shop in Chandigarh."));
        assert!(reqs[0].wants_json());
    }

    #[tokio::test]
    async fn too_few_features_is_structured_error() {
        let p = ScriptedProvider::new([
            r#"{"product_name":"X","tagline":"t","target_audience":"a","mvp_features":["only one"]}"#,
        ]);
        let err = run(&p, "idea").await.unwrap_err();
        assert!(matches!(err, GenesisError::StructuredOutput { stage: STAGE, .. }));
        assert_eq!(p.requests().len(), 1, "no internal retry");
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let p = ScriptedProvider::default();
        p.push_error(GenesisError::provider("429 quota exceeded"));
        let err = run(&p, "idea").await.unwrap_err();
        assert!(matches!(err, GenesisError::Provider(ref m) if m.contains("429")));
    }
}

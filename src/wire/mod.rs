use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// ========================================
/// Pipeline data model
/// ========================================

/// Structured product plan produced by the product stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPlan {
    pub product_name: String,
    pub tagline: String,
    pub target_audience: String,
    pub mvp_features: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppLayout {
    #[serde(rename = "sidebar")]
    Sidebar,
    #[serde(rename = "top-down")]
    TopDown,
}

impl AppLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppLayout::Sidebar => "sidebar",
            AppLayout::TopDown => "top-down",
        }
    }
}

/// UI components chosen for a single MVP feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDesign {
    pub feature: String,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UIDesignPlan {
    pub app_layout: AppLayout,
    pub feature_designs: Vec<FeatureDesign>,
}

/// Output bundle of one orchestration run. Each field comes from exactly one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub product_plan: ProductPlan,
    pub design_plan: UIDesignPlan,
    pub generated_source: String,
}

/// ========================================
/// Provider request
/// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Pipeline stage name, used for logging and transcripts.
    pub stage: String,
    pub system: String,
    pub user: String,
    /// JSON schema the response must follow. `None` means free-form text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl CompletionRequest {
    pub fn text(stage: &str, system: String, user: String) -> Self {
        Self { stage: stage.to_string(), system, user, response_schema: None }
    }

    pub fn structured(stage: &str, system: String, user: String, schema: Value) -> Self {
        Self { stage: stage.to_string(), system, user, response_schema: Some(schema) }
    }

    pub fn wants_json(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// Schema for [`ProductPlan`], in the OpenAPI subset every provider accepts.
pub fn product_plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "product_name": { "type": "string", "description": "A catchy, brandable name for the startup." },
            "tagline": { "type": "string", "description": "A short, memorable tagline for the product." },
            "target_audience": { "type": "string", "description": "A description of the ideal user persona." },
            "mvp_features": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": 3,
                "maxItems": 5,
                "description": "A list of 3-5 core features for the Minimum Viable Product."
            }
        },
        "required": ["product_name", "tagline", "target_audience", "mvp_features"]
    })
}

/// Schema for [`UIDesignPlan`].
pub fn design_plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "app_layout": {
                "type": "string",
                "enum": ["sidebar", "top-down"],
                "description": "Overall layout style: 'sidebar' or 'top-down'."
            },
            "feature_designs": {
                "type": "array",
                "description": "One design per feature, in the same order as the features were given.",
                "items": {
                    "type": "object",
                    "properties": {
                        "feature": { "type": "string", "description": "The original feature text." },
                        "components": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Specific Streamlit UI components for the feature, e.g. st.text_input."
                        }
                    },
                    "required": ["feature", "components"]
                }
            }
        },
        "required": ["app_layout", "feature_designs"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_uses_literal_names() {
        let v = serde_json::to_value(AppLayout::TopDown).unwrap();
        assert_eq!(v, json!("top-down"));
        let parsed: AppLayout = serde_json::from_str("\"sidebar\"").unwrap();
        assert_eq!(parsed, AppLayout::Sidebar);
        assert!(serde_json::from_str::<AppLayout>("\"grid\"").is_err());
    }

    #[test]
    fn text_requests_carry_no_schema() {
        let req = CompletionRequest::text("engineering", "sys".into(), "usr".into());
        assert!(!req.wants_json());
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("response_schema").is_none());
    }
}

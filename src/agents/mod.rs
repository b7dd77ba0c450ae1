//! The three generation stages. Each wraps exactly one provider call with a
//! fixed prompt template and an expected output shape.

pub mod design;
pub mod engineering;
pub mod product;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::wire::{AppLayout, FeatureDesign, ProductPlan, UIDesignPlan};

    pub const PRODUCT_JSON: &str = r#"{
        "product_name": "Chai & Chapters",
        "tagline": "Brewed in the City Beautiful.",
        "target_audience": "Students and young professionals in Chandigarh looking for a cozy place to work and meet.",
        "mvp_features": ["Digital menu", "Table reservations", "Loyalty stamps"]
    }"#;

    pub const DESIGN_JSON: &str = r#"{
        "app_layout": "sidebar",
        "feature_designs": [
            { "feature": "Digital menu", "components": ["st.dataframe", "st.selectbox"] },
            { "feature": "Table reservations", "components": ["st.form", "st.date_input", "st.form_submit_button"] },
            { "feature": "Loyalty stamps", "components": ["st.metric", "st.button"] }
        ]
    }"#;

    pub const SOURCE: &str = "import streamlit as st\nimport pandas as pd\n\nif 'orders' not in st.session_state:\n    st.session_state.orders = []\n\nst.title(\"Chai & Chapters\")";

    pub fn product_plan() -> ProductPlan {
        ProductPlan {
            product_name: "Chai & Chapters".into(),
            tagline: "Brewed in the City Beautiful.".into(),
            target_audience: "Students and young professionals in Chandigarh looking for a cozy place to work and meet."
                .into(),
            mvp_features: vec!["Digital menu".into(), "Table reservations".into(), "Loyalty stamps".into()],
        }
    }

    pub fn design_plan() -> UIDesignPlan {
        let fd = |feature: &str, components: &[&str]| FeatureDesign {
            feature: feature.into(),
            components: components.iter().map(|c| c.to_string()).collect(),
        };
        UIDesignPlan {
            app_layout: AppLayout::Sidebar,
            feature_designs: vec![
                fd("Digital menu", &["st.dataframe", "st.selectbox"]),
                fd("Table reservations", &["st.form", "st.date_input", "st.form_submit_button"]),
                fd("Loyalty stamps", &["st.metric", "st.button"]),
            ],
        }
    }
}

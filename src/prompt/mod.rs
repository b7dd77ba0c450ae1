use serde_json::Value;

use crate::store::ChatMessage;
use crate::wire::{ProductPlan, UIDesignPlan};

fn json_contract(schema: &Value) -> String {
    let schema = serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Return EXACTLY ONE JSON object (no markdown, no prose, no code fences) that conforms to this JSON schema:

{schema}"#
    )
}

pub fn system_prompt_product(schema: &Value) -> String {
    format!(
        r#"You are a world-class Product Manager. Your task is to analyze a startup idea and create a concise product plan.
The plan must be structured, realistic, and focused on a minimal viable product.

Rules:
- `product_name` is catchy and brandable.
- `tagline` is short and memorable.
- `target_audience` describes the ideal user persona in one or two sentences.
- `mvp_features` lists 3 to 5 core features, each a short imperative phrase.

{contract}"#,
        contract = json_contract(schema)
    )
}

pub fn user_prompt_product(idea: &str) -> String {
    format!("Startup Idea: \"{idea}\"")
}

pub fn system_prompt_design(schema: &Value) -> String {
    format!(
        r#"You are an expert UI/UX Designer specializing in rapid prototyping with Streamlit.
Based on a list of features, design a simple UI structure.

Rules:
- `app_layout` is "sidebar" when the app needs navigation between features, otherwise "top-down" for a simple single page.
- Produce exactly one entry in `feature_designs` per feature, in the order given. `feature` repeats the original feature text.
- `components` lists the specific Streamlit components needed, e.g. ["st.text_input", "st.button"].

{contract}"#,
        contract = json_contract(schema)
    )
}

/// `features_json` is the feature list serialized as a JSON array, order preserved.
pub fn user_prompt_design(features_json: &str) -> String {
    format!(
        "MVP Features:\n{features_json}\n\nGenerate a UI design plan based on these features."
    )
}

pub fn system_prompt_engineering() -> String {
    r#"You are an expert Senior Python Developer specializing in creating robust, single-file Streamlit applications.
Your task is to generate the complete Python code for a Streamlit app based on the provided Product and Design plans.

CRITICAL INSTRUCTIONS:
1.  Your output MUST be ONLY the raw Python code for the Streamlit application.
2.  Do NOT include any explanations, comments outside the code, or markdown formatting like ```python.
3.  The code must be fully functional and runnable.
4.  Correctly import all necessary libraries (e.g., `import streamlit as st`, `import pandas as pd`, `from datetime import datetime`).
5.  Use `st.session_state` to initialize and manage all application data. Check if data exists in `st.session_state` before accessing it. For example: `if 'my_data' not in st.session_state: st.session_state.my_data = []`.
6.  For data handling and display, use the `pandas` library. Store data as a list of dictionaries in `st.session_state`, then convert it to a DataFrame for display with `st.dataframe`.
7.  The Design Plan may suggest Streamlit components that DO NOT EXIST (e.g., 'st.calendar'). You MUST replace any non-existent component with the closest valid, working alternative. For example, to show data for a specific day, use `st.date_input` to select a date, then filter the DataFrame to that date.
8.  Ensure every `on_click` callback is defined and explicitly updates `st.session_state`.
9.  If you use `st.form`, you MUST use `st.form_submit_button` to submit the form. Do NOT use `st.button` inside a form.
10. Re-evaluate each and every line of code before generating the output."#
        .to_string()
}

pub fn user_prompt_engineering(product: &ProductPlan, design: &UIDesignPlan) -> String {
    let product_json = serde_json::to_string(product).unwrap_or_else(|_| "{}".to_string());
    let design_json = serde_json::to_string(design).unwrap_or_else(|_| "{}".to_string());
    format!("Product Plan:\n{product_json}\n\nDesign Plan:\n{design_json}")
}

pub fn system_prompt_advisor() -> String {
    r#"You are 'Genesis', a sharp and concise startup advisor AI.
You help founders refine ideas, find their first customers, pick a minimal feature set and avoid common early-stage mistakes.
Keep answers short and practical: a few sentences or a tight bullet list. Ask one clarifying question when the request is ambiguous.
Never invent statistics; say so when you are unsure."#
        .to_string()
}

/// Render the recent conversation (oldest first) followed by the new question.
pub fn user_prompt_advisor(history: &[ChatMessage], question: &str) -> String {
    let transcript = if history.is_empty() {
        "(no previous messages)".to_string()
    } else {
        history
            .iter()
            .map(|m| format!("{}: {}", m.sender, m.text))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!("Conversation so far:\n{transcript}\n\nUser question: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{product_plan_schema, AppLayout, FeatureDesign};

    #[test]
    fn product_prompt_embeds_idea_and_schema() {
        assert!(user_prompt_product("A cafe shop in Chandigarh.").contains("\"A cafe shop in Chandigarh.\""));
        let sys = system_prompt_product(&product_plan_schema());
        assert!(sys.contains("\"mvp_features\""));
        assert!(sys.contains("EXACTLY ONE JSON object"));
    }

    #[test]
    fn engineering_prompt_carries_both_plans() {
        let product = ProductPlan {
            product_name: "Brew".into(),
            tagline: "Coffee, sorted.".into(),
            target_audience: "Commuters".into(),
            mvp_features: vec!["Menu".into(), "Orders".into(), "Loyalty".into()],
        };
        let design = UIDesignPlan {
            app_layout: AppLayout::TopDown,
            feature_designs: vec![FeatureDesign { feature: "Menu".into(), components: vec!["st.table".into()] }],
        };
        let user = user_prompt_engineering(&product, &design);
        assert!(user.contains("\"product_name\":\"Brew\""));
        assert!(user.contains("\"app_layout\":\"top-down\""));
        assert!(system_prompt_engineering().contains("st.form_submit_button"));
    }
}

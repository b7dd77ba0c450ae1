use serde::de::DeserializeOwned;

use crate::errors::{GenesisError, Result};
use crate::wire::{ProductPlan, UIDesignPlan};

/// Parse model text into `T`, then run `validate` over the parsed value.
///
/// Strict parse first; if that fails, fall back to the first balanced `{...}`
/// object in the text (models like to wrap JSON in prose or fences).
pub fn parse_validated<T, F>(stage: &'static str, text: &str, validate: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> std::result::Result<(), String>,
{
    let parsed = match serde_json::from_str::<T>(text.trim()) {
        Ok(v) => v,
        Err(strict_err) => {
            let obj = extract_first_json_object(text).ok_or_else(|| {
                GenesisError::structured(stage, format!("no JSON object in response ({strict_err})"))
            })?;
            serde_json::from_str::<T>(obj)
                .map_err(|e| GenesisError::structured(stage, format!("response does not match schema: {e}")))?
        }
    };
    validate(&parsed).map_err(|reason| GenesisError::structured(stage, reason))?;
    Ok(parsed)
}

pub fn validate_product_plan(plan: &ProductPlan) -> std::result::Result<(), String> {
    if plan.product_name.trim().is_empty() {
        return Err("product_name is empty".into());
    }
    let n = plan.mvp_features.len();
    if !(3..=5).contains(&n) {
        return Err(format!("expected 3-5 mvp_features, got {n}"));
    }
    if plan.mvp_features.iter().any(|f| f.trim().is_empty()) {
        return Err("mvp_features contains an empty entry".into());
    }
    Ok(())
}

/// The design plan must cover every requested feature, one design each.
pub fn validate_design_plan(plan: &UIDesignPlan, feature_count: usize) -> std::result::Result<(), String> {
    if plan.feature_designs.len() != feature_count {
        return Err(format!(
            "expected {feature_count} feature_designs, got {}",
            plan.feature_designs.len()
        ));
    }
    Ok(())
}

/// Extracts the first top-level JSON object substring from a string.
/// Braces inside JSON strings are ignored; returns None if no object closes.
pub fn extract_first_json_object(s: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if start.is_some() => in_string = true,
            b'{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| &s[st..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

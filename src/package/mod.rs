//! Turning a generation result into a deliverable: an in-memory zip for
//! download, or the same files written to a timestamped directory.

use chrono::{DateTime, Local};
use fs_err as fs;
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::{GenesisError, Result};
use crate::wire::{GenerationResult, ProductPlan, UIDesignPlan};

pub const SOURCE_FILE: &str = "app.py";
pub const PRODUCT_PLAN_FILE: &str = "product_plan.json";
pub const DESIGN_PLAN_FILE: &str = "design_plan.json";
pub const README_FILE: &str = "README.md";
pub const DEFAULT_BASE_NAME: &str = "autogenesis_project";
pub const EMPTY_SOURCE_PLACEHOLDER: &str = "# No code was generated for this project.\n";

pub struct Archive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// What gets packaged. Plans are optional because stored projects may lack them.
pub struct PackageInput<'a> {
    pub product_plan: Option<&'a ProductPlan>,
    pub design_plan: Option<&'a UIDesignPlan>,
    pub source: &'a str,
    pub idea: &'a str,
    pub title: &'a str,
}

impl<'a> PackageInput<'a> {
    pub fn from_result(result: &'a GenerationResult, idea: &'a str, title: &'a str) -> Self {
        Self {
            product_plan: Some(&result.product_plan),
            design_plan: Some(&result.design_plan),
            source: &result.generated_source,
            idea,
            title,
        }
    }
}

/// Replace every char outside `[A-Za-z0-9_-]` with `_`, one for one.
pub fn sanitize_base_name(title: &str) -> String {
    if title.is_empty() {
        return DEFAULT_BASE_NAME.to_string();
    }
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn pretty_or_empty<T: Serialize>(v: Option<&T>) -> Result<String> {
    match v {
        Some(v) => serde_json::to_string_pretty(v).map_err(|e| GenesisError::Packaging(e.to_string())),
        None => Ok("{}".to_string()),
    }
}

pub fn readme(title: &str, tagline: Option<&str>, idea: &str) -> String {
    let heading = if title.trim().is_empty() { DEFAULT_BASE_NAME } else { title };
    let mut out = format!("# {heading}\n\n");
    if let Some(t) = tagline.filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("**Tagline:** {t}\n\n"));
    }
    out.push_str(&format!("## Original idea\n\n{idea}\n\n"));
    out.push_str(&format!(
        "## Running it\n\n```bash\npip install streamlit pandas\nstreamlit run {SOURCE_FILE}\n```\n\nThis MVP was generated by AutoGenesis.\n"
    ));
    out
}

/// The four deliverable files, in archive order.
fn entries(input: &PackageInput<'_>) -> Result<Vec<(&'static str, String)>> {
    let source = if input.source.trim().is_empty() {
        EMPTY_SOURCE_PLACEHOLDER.to_string()
    } else {
        input.source.to_string()
    };
    let tagline = input.product_plan.map(|p| p.tagline.as_str());
    Ok(vec![
        (SOURCE_FILE, source),
        (PRODUCT_PLAN_FILE, pretty_or_empty(input.product_plan)?),
        (DESIGN_PLAN_FILE, pretty_or_empty(input.design_plan)?),
        (README_FILE, readme(input.title, tagline, input.idea)),
    ])
}

/// Build a deflated zip in memory. Entry timestamps are pinned so the same
/// input always yields the same bytes.
pub fn archive_from(input: &PackageInput<'_>) -> Result<Archive> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries(input)? {
        zip.start_file(name, options)?;
        zip.write_all(contents.as_bytes())?;
    }
    let bytes = zip.finish()?.into_inner();

    Ok(Archive { file_name: format!("{}.zip", sanitize_base_name(input.title)), bytes })
}

pub fn build_archive(result: &GenerationResult, idea: &str, title: &str) -> Result<Archive> {
    archive_from(&PackageInput::from_result(result, idea, title))
}

/// Write the four files to `<out_root>/<base>_<YYYYmmdd_HHMMSS>/` and return the directory.
pub fn export_to_dir(input: &PackageInput<'_>, out_root: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    let base = sanitize_base_name(input.title).to_lowercase();
    let dir = out_root.join(format!("{base}_{}", now.format("%Y%m%d_%H%M%S")));
    fs::create_dir_all(&dir)?;
    for (name, contents) in entries(input)? {
        fs::write(dir.join(name), contents)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::fixtures;
    use chrono::TimeZone;
    use std::io::Read;
    use zip::ZipArchive;

    fn result() -> GenerationResult {
        GenerationResult {
            product_plan: fixtures::product_plan(),
            design_plan: fixtures::design_plan(),
            generated_source: fixtures::SOURCE.to_string(),
        }
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut f = archive.by_name(name).unwrap();
        let mut s = String::new();
        f.read_to_string(&mut s).unwrap();
        s
    }

    fn names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut v: Vec<String> = archive.file_names().map(String::from).collect();
        v.sort();
        v
    }

    #[test]
    fn sanitizes_one_char_per_char() {
        assert_eq!(sanitize_base_name("My Café/App"), "My_Caf__App");
        assert_eq!(sanitize_base_name("ok-name_2"), "ok-name_2");
        assert_eq!(sanitize_base_name("☕"), "_");
        assert_eq!(sanitize_base_name(""), DEFAULT_BASE_NAME);
    }

    #[test]
    fn archive_has_four_entries() {
        let archive = build_archive(&result(), "A cafe shop in Chandigarh.", "My Café/App").unwrap();
        assert_eq!(archive.file_name, "My_Caf__App.zip");
        assert_eq!(names(&archive.bytes), vec!["README.md", "app.py", "design_plan.json", "product_plan.json"]);
        assert_eq!(read_entry(&archive.bytes, SOURCE_FILE), fixtures::SOURCE);

        let plan: ProductPlan = serde_json::from_str(&read_entry(&archive.bytes, PRODUCT_PLAN_FILE)).unwrap();
        assert_eq!(plan, fixtures::product_plan());
        assert!(read_entry(&archive.bytes, DESIGN_PLAN_FILE).contains("\n  \"app_layout\": \"sidebar\""));
    }

    #[test]
    fn readme_has_idea_and_tagline() {
        let archive = build_archive(&result(), "A cafe shop in Chandigarh.", "Chai & Chapters").unwrap();
        let readme = read_entry(&archive.bytes, README_FILE);
        assert!(readme.contains("A cafe shop in Chandigarh."));
        assert!(readme.contains("Brewed in the City Beautiful."));
        assert!(readme.starts_with("# Chai & Chapters"));
    }

    #[test]
    fn missing_plans_and_source_get_placeholders() {
        let input = PackageInput { product_plan: None, design_plan: None, source: "  ", idea: "idea", title: "" };
        let archive = archive_from(&input).unwrap();
        assert_eq!(archive.file_name, "autogenesis_project.zip");
        assert_eq!(names(&archive.bytes).len(), 4);
        assert_eq!(read_entry(&archive.bytes, PRODUCT_PLAN_FILE), "{}");
        assert_eq!(read_entry(&archive.bytes, DESIGN_PLAN_FILE), "{}");
        assert_eq!(read_entry(&archive.bytes, SOURCE_FILE), EMPTY_SOURCE_PLACEHOLDER);
    }

    #[test]
    fn archives_are_reproducible() {
        let a = build_archive(&result(), "idea", "title").unwrap();
        let b = build_archive(&result(), "idea", "title").unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn export_writes_timestamped_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let r = result();
        let now = Local.with_ymd_and_hms(2025, 9, 12, 14, 44, 33).unwrap();
        let dir = export_to_dir(&PackageInput::from_result(&r, "A cafe shop in Chandigarh.", "MedXpress Chandigarh"), tmp.path(), now)
            .unwrap();
        assert_eq!(dir.file_name().unwrap(), "medxpress_chandigarh_20250912_144433");
        for f in [SOURCE_FILE, PRODUCT_PLAN_FILE, DESIGN_PLAN_FILE, README_FILE] {
            assert!(dir.join(f).is_file(), "{f} missing");
        }
    }
}

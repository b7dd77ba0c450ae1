use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::wire::{ProductPlan, UIDesignPlan};

pub fn banner(idea: &str) {
    println!("\n{}", "🚀 AutoGenesis".bold());
    println!("{} \"{}\"\n", "Idea:".bold(), idea);
}

/// Spinner shown while the pipeline runs; call `finish_and_clear` when done.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn show_product_plan(plan: &ProductPlan) {
    println!("\n=== PRODUCT ===");
    println!("{}  {}", plan.product_name.bold(), plan.tagline.italic());
    println!("{} {}", "Audience:".dimmed(), plan.target_audience);
    for (i, f) in plan.mvp_features.iter().enumerate() {
        println!("{}. {}", i + 1, f.green());
    }
}

pub fn show_design_plan(plan: &UIDesignPlan) {
    println!("\n=== DESIGN ===");
    println!("{} {}", "Layout:".bold(), plan.app_layout.as_str().cyan());
    for d in &plan.feature_designs {
        println!("  {}  {}", format!("[{}]", d.feature).yellow().bold(), d.components.join(", "));
    }
}

pub fn show_outcome(dir: &Path, archive: Option<(&Path, usize)>, source_bytes: usize, elapsed: Duration) {
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━━━ Done ━━━━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!("  {}: {}", "Project".green().bold(), dir.display());
    if let Some((path, size)) = archive {
        println!("  {}: {} ({})", "Archive".cyan().bold(), path.display(), format_size(size, DECIMAL));
    }
    println!(
        "  {}: {}   {}: {:.2}s",
        "app.py".bold(),
        format_size(source_bytes, DECIMAL),
        "Time".bold(),
        elapsed.as_secs_f64()
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());
    println!("\nRun it with: {}", format!("streamlit run {}", dir.join("app.py").display()).bold());
}

pub fn show_error(err: &dyn std::fmt::Display) {
    eprintln!("{} {}", "error:".red().bold(), err);
}

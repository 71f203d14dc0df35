use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use std::path::Path;

// Import from fillmate-core
use fillmate_core::{
    parse_snapshot, ContentRequest, ContentResponse, ElementHandle, FillReport, FillSession,
    FillSettings, PageDocument, PassStages,
};

// Import CLI utilities
use fillmate_cli::{logging, DataDirManager};

#[derive(Parser)]
#[command(name = "fillmate")]
#[command(about = "Fill job application forms in saved page snapshots from your profile and canned answers")]
struct Args {
    /// Path to the page snapshot (XHTML) to fill
    #[arg(short, long)]
    input: Option<String>,

    /// Path to the data file (profiles, templates, settings)
    /// If not specified, uses the user data directory
    #[arg(short, long)]
    data: Option<String>,

    /// Path to custom settings file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Use this profile instead of the active one
    #[arg(long)]
    profile_id: Option<String>,

    /// Write this text into the focused field instead of filling the form
    #[arg(long)]
    template: Option<String>,

    /// Only locate, match and plan; write the stages instead of filling
    #[arg(long)]
    plan_only: bool,

    /// Create the default data file if missing and exit
    #[arg(long)]
    init_data: bool,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,

    /// Enable step timings for the pass
    #[arg(long)]
    profile: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

/// Final value of one field after the pass
#[derive(Serialize)]
struct FieldValue {
    handle: ElementHandle,
    name: Option<String>,
    value: String,
}

#[derive(Serialize)]
struct PassOutput<'a> {
    response: ContentResponse,
    report: &'a FillReport,
    fields: Vec<FieldValue>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    println!("🦀 FillMate Form Filler");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    let data_dir = DataDirManager::new()?;

    if args.init_data {
        let store = data_dir.ensure_store()?;
        println!("📁 Data file: {}", store.path().display());
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        println!("⚠️  No page snapshot given.");
        println!("   Use -i <snapshot.xhtml>, or --show-configs for all options.");
        return Ok(());
    };

    // Check if input file exists
    if !Path::new(input).exists() {
        println!("⚠️  Page snapshot not found at: {}", input);
        println!("   Please check the file path.");
        return Ok(());
    }

    let mut data = data_dir.load(args.data.as_deref())?;
    if let Some(id) = &args.profile_id {
        data.set_active_profile(id)?;
    }

    let base_settings = FillSettings::load_with_fallback(args.config.as_deref());
    if let Some(config_path) = &args.config {
        println!("📋 Loaded settings from: {}", config_path);
    } else {
        println!("📋 Using default settings");
    }

    let session = FillSession::new(data.fill_settings(&base_settings))?.with_profiling(args.profile);
    let profile = data.active_profile().map(|p| &p.personal_info);
    match data.active_profile() {
        Some(p) => println!("👤 Profile: {} ({})", p.name, p.id),
        None => println!("👤 No active profile"),
    }

    println!("📄 Reading snapshot: {}", input);
    let markup = std::fs::read_to_string(input)?;
    let mut document = parse_snapshot(&markup)?;

    let output_path = output_path(&args, input);

    if args.plan_only {
        let stages = session.plan(&document, profile, &data.templates);
        save_stages(&stages, &output_path)?;
        return Ok(());
    }

    let request = match &args.template {
        Some(text) => ContentRequest::FillTemplate {
            template: text.clone(),
        },
        None => ContentRequest::FillForm,
    };

    // Ctrl-C behaves like the page navigating away mid-pass
    let cancel = session.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning remaining fields");
            cancel.cancel();
        }
    });

    let report = match &request {
        ContentRequest::FillForm => {
            session
                .run_pass(&mut document, profile, &data.templates)
                .await?
        }
        ContentRequest::FillTemplate { template } => session.fill_focused(&mut document, template),
    };
    ctrl_c.abort();

    let response = ContentResponse::from_report(&report);
    println!("✅ {}", response.message);
    if !report.failures.is_empty() {
        println!("   ❌ {} fields could not be written", report.failures.len());
    }
    if report.cancelled {
        println!("   ⏹️  Stopped before the plan finished");
    }

    save_report(response, &report, &document, &output_path)?;

    Ok(())
}

fn output_path(args: &Args, input: &str) -> String {
    if let Some(output) = &args.output {
        return output.clone();
    }
    let input_name = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    let suffix = if args.plan_only { "plan" } else { "filled" };
    format!("{input_name}_{suffix}.json")
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --input <path>          Page snapshot (XHTML) to fill");
    println!("  --data <path>           Data file with profiles/templates/settings (default: user data dir)");
    println!("  --config <path>         Load custom settings file (YAML)");
    println!("  --output <path>         Output file path (auto-generated if not specified)");
    println!("  --profile-id <id>       Fill with this profile instead of the active one");
    println!("  --template <text>       Write text into the focused field only");
    println!("  --plan-only             Dry run: write located fields, matches and the plan");
    println!("  --init-data             Create the default data file and exit");
    println!("  --profile               Log step timings");

    println!("\n⚙️  Settings file keys (YAML):");
    println!("  enabled                 Master switch (default: true; stored autoFillEnabled wins)");
    println!("  fill_delay_ms           Pause between fills in ms (default: 100; stored fillDelay wins)");
    println!("  highlight_ms            Highlight duration in ms (default: 1000)");
    println!("  template_matching       enabled, context_max_chars (default: 200)");
    println!("  catalog.rules           Ordered field rules: field_type, patterns, attributes, confidence");

    println!("\n📝 Usage Examples:");
    println!("  cargo run -- -i application.xhtml");
    println!("  cargo run -- -i application.xhtml --plan-only");
    println!("  cargo run -- -i application.xhtml -c settings.yaml -o filled.json");
    println!("  cargo run -- -i application.xhtml --template \"I am excited to apply.\"");

    println!("\n📁 Data:");
    println!("  First run writes a default profile and four answer templates to");
    println!("  ~/.local/share/fillmate/data.json. Edit it or pass --data.");
}

fn save_stages(stages: &PassStages, output_path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(stages)?;
    std::fs::write(output_path, json)?;
    println!("  📋 {} candidate fields", stages.candidates.len());
    println!("  💬 {} template matches", stages.template_matches.len());
    println!("  ✍️  {} planned fills", stages.plan.len());
    println!("💾 Plan saved to: {}", output_path);
    Ok(())
}

fn save_report(
    response: ContentResponse,
    report: &FillReport,
    document: &PageDocument,
    output_path: &str,
) -> Result<()> {
    let fields = document
        .form_fields()
        .into_iter()
        .map(|(handle, _)| FieldValue {
            handle,
            name: document.attr(handle, "name").map(str::to_string),
            value: document.value(handle),
        })
        .collect();

    let output = PassOutput {
        response,
        report,
        fields,
    };
    std::fs::write(output_path, serde_json::to_string_pretty(&output)?)?;
    println!("💾 Report saved to: {}", output_path);
    Ok(())
}

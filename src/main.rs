//! # outreach
//!
//! Command-line front end: reads a research report, lets the user pick
//! stakeholders and writes the generated emails as markdown.

#![deny(unsafe_code)]

mod interactive;
mod provider_factory;
mod report;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use tokio::io::AsyncReadExt;
use tracing::info;

use outreach_core::store::TemplateStore;
use outreach_core::task::{GenerationMode, ModeConfig, TemplateSource};
use outreach_engine::prompts::{custom, styles, templates};
use outreach_engine::{GenerationRequest, Orchestrator, ReportSource};
use outreach_settings::{load_settings, load_settings_from_path, OutreachSettings};

/// Personalized cold-email generator for healthcare stakeholders.
#[derive(Parser, Debug)]
#[command(name = "outreach", version, about)]
struct Cli {
    /// Settings file (defaults to ~/.outreach/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate emails for stakeholders found in a report.
    Generate(GenerateArgs),
    /// List the built-in AI styles.
    Styles,
    /// List the built-in editable templates and their fields.
    Templates,
    /// Show example custom instructions.
    Examples,
    /// Manage saved prompt templates.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Report text file, or `-` for stdin.
    #[arg(long)]
    report: String,

    /// ai_style, template or custom. Unknown values fall back to ai_style.
    #[arg(long, default_value = "ai_style")]
    mode: String,

    /// Style key for ai_style mode.
    #[arg(long)]
    style: Option<String>,

    /// Built-in template key for template mode.
    #[arg(long)]
    template: Option<String>,

    /// Template field value, repeatable: `--field subject="sepsis at acme"`.
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// File holding a complete template prompt (template mode).
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Saved template id (template mode, needs --owner).
    #[arg(long)]
    template_id: Option<i64>,

    /// Owner of saved templates.
    #[arg(long)]
    owner: Option<String>,

    /// Instructions for custom mode.
    #[arg(long)]
    instructions: Option<String>,

    /// Company name; derived from the report summary when omitted.
    #[arg(long)]
    company: Option<String>,

    /// Skip the selection prompt and generate for every stakeholder.
    #[arg(long)]
    all: bool,

    /// Markdown output path.
    #[arg(long, short, default_value = "generated_emails.md")]
    output: PathBuf,

    /// Also print the records as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Model override.
    #[arg(long)]
    model: Option<String>,

    /// Quality threshold override (0-10).
    #[arg(long)]
    threshold: Option<f64>,

    /// Max stakeholders processed at once.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum StoreAction {
    /// Save a prompt template.
    Add {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        /// File holding the prompt text.
        #[arg(long)]
        prompt_file: PathBuf,
    },
    /// Replace a template's prompt text.
    Update {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: i64,
        #[arg(long)]
        prompt_file: PathBuf,
    },
    /// List an owner's templates.
    List {
        #[arg(long)]
        owner: String,
    },
    /// Delete a template.
    Delete {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: i64,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty field name in `{raw}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

impl GenerateArgs {
    fn apply_overrides(&self, settings: &mut OutreachSettings) -> Result<()> {
        if let Some(model) = &self.model {
            settings.llm.model = model.clone();
        }
        if let Some(threshold) = self.threshold {
            settings.generation.quality_threshold = threshold;
        }
        if let Some(concurrency) = self.concurrency {
            settings.generation.concurrency = concurrency;
        }
        settings.validate().context("invalid command-line override")?;
        Ok(())
    }

    /// Assemble the loose config object and let the core parser decide the
    /// mode, so the CLI and programmatic callers share one interpretation.
    fn mode_config(&self) -> Result<ModeConfig> {
        let mut config = Map::new();
        if let Some(style) = &self.style {
            config.insert("style_key".into(), json!(style));
        }
        if let Some(path) = &self.prompt_file {
            let prompt = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            config.insert("prompt_template".into(), json!(prompt));
        }
        if let Some(id) = self.template_id {
            config.insert("template_id".into(), json!(id));
        }
        if let Some(key) = &self.template {
            config.insert("template_key".into(), json!(key));
        }
        let fields: BTreeMap<String, String> = self.fields.iter().cloned().collect();
        config.insert("user_fields".into(), json!(fields));
        if let Some(instructions) = &self.instructions {
            config.insert("custom_instructions".into(), json!(instructions));
        }

        let mut mode_config = ModeConfig::from_loose(&self.mode, &Value::Object(config));
        // Unset built-in fields would render empty; show the hint instead.
        if let ModeConfig::Template(TemplateSource::BuiltIn {
            template_key,
            user_fields,
        }) = &mut mode_config
        {
            if let Some(template) = templates::template(template_key) {
                *user_fields = template.fields_with_hints(user_fields);
            }
        }
        Ok(mode_config)
    }
}

async fn read_report(arg: &str) -> Result<ReportSource> {
    if arg == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read report from stdin")?;
        return Ok(ReportSource::Text(text));
    }
    Ok(ReportSource::File(PathBuf::from(arg)))
}

async fn generate(mut settings: OutreachSettings, args: GenerateArgs) -> Result<()> {
    args.apply_overrides(&mut settings)?;
    let mode_config = args.mode_config()?;

    let stored = matches!(mode_config, ModeConfig::Template(TemplateSource::Stored { .. }));
    if stored && args.owner.is_none() {
        bail!("--template-id requires --owner");
    }
    if args.report == "-" && !args.all {
        bail!("reading the report from stdin requires --all");
    }

    let provider = provider_factory::build_provider(&settings)?;
    let reference = Arc::new(provider_factory::reference_material(&settings));
    let store: Option<Arc<dyn TemplateStore>> = if stored {
        Some(Arc::new(provider_factory::open_template_repo(&settings)?))
    } else {
        None
    };
    let config = provider_factory::engine_config(&settings);
    let orchestrator = Orchestrator::new(provider, reference, &config, store);

    let mut request = GenerationRequest::new(mode_config);
    request.caller = args.owner.clone();
    request.company_name = args.company.clone();

    let source = read_report(&args.report).await?;
    let output = if args.all {
        orchestrator.run_all(&source, &request).await?
    } else {
        orchestrator
            .run_interactive(&source, &interactive::PromptSelector::stdio(), &request)
            .await?
    };

    report::write_markdown(&args.output, &output.records, config.gate.quality_threshold)?;
    info!(
        run_id = %output.run_id,
        company = %output.company_name,
        emails = output.records.len(),
        path = %args.output.display(),
        "report written"
    );
    eprintln!("Wrote {} emails to {}", output.records.len(), args.output.display());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.records)?);
    }
    Ok(())
}

fn list_styles(settings: &OutreachSettings) {
    for style in styles::STYLES {
        let marker = if style.key == settings.generation.default_style { " (default)" } else { "" };
        println!("{}{}\n  {}\n  {}\n", style.key, marker, style.name, style.description);
    }
}

fn list_templates() {
    for template in templates::TEMPLATES {
        println!("{}: {}\n  {}", template.key, template.name, template.description);
        for (name, hint) in template.user_fields {
            println!("  --field {name}=...   {hint}");
        }
        println!();
    }
}

fn list_examples() {
    println!(
        "Custom instructions must be {}-{} characters.\n",
        custom::MIN_INSTRUCTION_CHARS,
        custom::MAX_INSTRUCTION_CHARS
    );
    for (i, example) in custom::EXAMPLES.iter().enumerate() {
        println!("{}. {}\n", i + 1, example);
    }
}

fn store_command(settings: &OutreachSettings, action: StoreAction) -> Result<()> {
    let repo = provider_factory::open_template_repo(settings)?;
    match action {
        StoreAction::Add {
            owner,
            name,
            prompt_file,
        } => {
            let prompt = std::fs::read_to_string(&prompt_file)
                .with_context(|| format!("failed to read {}", prompt_file.display()))?;
            let row = repo.create(&owner, &name, &prompt)?;
            println!("saved template {} ({})", row.id, row.name);
        }
        StoreAction::Update { owner, id, prompt_file } => {
            let prompt = std::fs::read_to_string(&prompt_file)
                .with_context(|| format!("failed to read {}", prompt_file.display()))?;
            repo.update_prompt(id, &owner, &prompt)?;
            println!("updated template {id}");
        }
        StoreAction::List { owner } => {
            for row in repo.list_for_owner(&owner)? {
                println!("{}\t{}\t{}", row.id, row.name, row.created_at);
            }
        }
        StoreAction::Delete { owner, id } => {
            if !repo.delete(id, &owner)? {
                bail!("template {id} not found for {owner}");
            }
            println!("deleted template {id}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)?,
        None => load_settings()?,
    };
    let _telemetry = outreach_telemetry::init_telemetry(provider_factory::telemetry_config(&settings));

    match cli.command {
        Command::Generate(args) => {
            let mode = GenerationMode::parse_lenient(&args.mode);
            info!(%mode, "starting generation");
            generate(settings, args).await
        }
        Command::Styles => {
            list_styles(&settings);
            Ok(())
        }
        Command::Templates => {
            list_templates();
            Ok(())
        }
        Command::Examples => {
            list_examples();
            Ok(())
        }
        Command::Store { action } => store_command(&settings, action),
    }
}

mod serve;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::OnceLock;

use clap::{Parser, Subcommand, ValueEnum};

use checkpath_core::{
    validate_configuration, AnswerValue, Configuration, Severity, ValidationIssue,
    ValidationReport,
};
use checkpath_engine::{applicable_outcomes, resolve_visible_path};

static CONFIGURATION_SCHEMA_STR: &str = include_str!("../../../docs/configuration-schema.json");
static CONFIGURATION_VALIDATOR: OnceLock<jsonschema::Validator> = OnceLock::new();

/// The compiled configuration schema validator. Compiled once per process;
/// both the validate subcommand and every HTTP handler share this instance.
pub(crate) fn configuration_validator() -> &'static jsonschema::Validator {
    CONFIGURATION_VALIDATOR.get_or_init(|| {
        let schema: serde_json::Value = serde_json::from_str(CONFIGURATION_SCHEMA_STR)
            .expect("embedded configuration schema is valid JSON");
        jsonschema::validator_for(&schema).expect("embedded configuration schema compiles")
    })
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Checkpath branching-checklist toolchain.
#[derive(Parser)]
#[command(name = "checkpath", version, about = "Checkpath decision engine toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration JSON file (structural + semantic checks)
    Validate {
        /// Path to the configuration JSON file
        file: PathBuf,
    },

    /// Resolve the visible path and outcomes for a configuration offline
    Simulate {
        /// Path to the configuration JSON file
        config: PathBuf,
        /// Path to an answers JSON file ({"questionId": value, ...})
        #[arg(long)]
        answers: Option<PathBuf>,
    },

    /// Start the HTTP JSON API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => {
            cmd_validate(&file, cli.output, cli.quiet);
        }
        Commands::Simulate { config, answers } => {
            cmd_simulate(&config, answers.as_deref(), cli.output, cli.quiet);
        }
        Commands::Serve { port } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(port)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Load and parse a JSON file, exiting with a reported error on failure.
fn read_json_file(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Validate a raw configuration document: JSON Schema first, then the
/// semantic checks once the document deserializes cleanly.
pub(crate) fn validation_report(doc: &serde_json::Value) -> ValidationReport {
    let structural: Vec<ValidationIssue> = configuration_validator()
        .iter_errors(doc)
        .map(|e| ValidationIssue {
            field: "configuration".to_string(),
            message: format!("{}", e),
            severity: Severity::Error,
        })
        .collect();

    if !structural.is_empty() {
        return ValidationReport {
            valid: false,
            errors: structural,
            warnings: Vec::new(),
        };
    }

    match serde_json::from_value::<Configuration>(doc.clone()) {
        Ok(config) => validate_configuration(&config),
        Err(e) => ValidationReport {
            valid: false,
            errors: vec![ValidationIssue {
                field: "configuration".to_string(),
                message: format!("configuration does not deserialize: {}", e),
                severity: Severity::Error,
            }],
            warnings: Vec::new(),
        },
    }
}

fn cmd_validate(file: &Path, output: OutputFormat, quiet: bool) {
    let doc = read_json_file(file, output, quiet);
    let report = validation_report(&doc);

    match output {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).expect("report serializes")
            );
        }
        OutputFormat::Text => {
            if report.valid {
                if !quiet {
                    println!("valid");
                    for w in &report.warnings {
                        println!("warning: {}", w);
                    }
                }
            } else {
                eprintln!("invalid configuration");
                for e in &report.errors {
                    eprintln!("error: {}", e);
                }
                for w in &report.warnings {
                    eprintln!("warning: {}", w);
                }
            }
        }
    }

    if !report.valid {
        process::exit(1);
    }
}

fn cmd_simulate(config_path: &Path, answers_path: Option<&Path>, output: OutputFormat, quiet: bool) {
    let doc = read_json_file(config_path, output, quiet);
    let config: Configuration = match serde_json::from_value(doc) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "error in configuration '{}': {}",
                config_path.display(),
                e
            );
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let mut answers: BTreeMap<String, AnswerValue> = BTreeMap::new();
    if let Some(path) = answers_path {
        let doc = read_json_file(path, output, quiet);
        let map = match doc.as_object() {
            Some(m) => m,
            None => {
                let msg = format!(
                    "answers file '{}' must be a JSON object keyed by question id",
                    path.display()
                );
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        };
        for (question_id, raw) in map {
            match AnswerValue::from_json(raw) {
                Some(value) => {
                    answers.insert(question_id.clone(), value);
                }
                None => {
                    let msg = format!(
                        "answer for '{}' must be a scalar or an array of scalars",
                        question_id
                    );
                    report_error(&msg, output, quiet);
                    process::exit(1);
                }
            }
        }
    }

    let path = resolve_visible_path(&config, &answers);
    let outcomes = applicable_outcomes(&config, &answers);

    match output {
        OutputFormat::Json => {
            let response = serde_json::json!({
                "visiblePath": path.iter().map(|q| &q.id).collect::<Vec<_>>(),
                "outcomes": outcomes,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&response).expect("response serializes")
            );
        }
        OutputFormat::Text => {
            if !quiet {
                println!("visible path ({} questions):", path.len());
                for q in &path {
                    let mark = if answers.contains_key(&q.id) { "*" } else { " " };
                    println!("  {} {}  {}", mark, q.id, q.text);
                }
                println!("outcomes ({}):", outcomes.len());
                for o in &outcomes {
                    println!("  [{}] {}  {}", o.priority, o.id, o.name);
                }
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use dirtask_core::task::{self, Task, VariantEntry};
use dirtask_core::{CodecConfig, Entry, PropertyValueMap, TaskProperty};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Build, inspect and convert directory server task entries.
#[derive(Parser)]
#[command(name = "dirtask", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON codec configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Parent DN for task entries (overrides the configuration file)
    #[arg(long, global = true, env = "DIRTASK_BASE_DN")]
    base_dn: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// List the task classes with a dedicated definition
    Classes,

    /// List the properties of the common record or of one task class
    Properties {
        /// Task class name; omit for the common properties
        #[arg(short, long)]
        class: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Turn a JSON property document into a task entry
    Encode {
        /// Task class name
        #[arg(short, long)]
        class: String,

        /// Property document (attribute name -> value or list); `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        #[arg(long, value_enum, default_value = "ldif")]
        format: EntryFormat,
    },

    /// Turn a JSON task entry into a property document
    Decode {
        /// JSON entry (`{"dn": ..., "attributes": [...]}`); `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum EntryFormat {
    Ldif,
    Json,
}

#[derive(Serialize)]
struct PropertyDoc<'a> {
    attribute: &'a str,
    display_name: &'a str,
    description: &'a str,
    kind: &'a str,
    required: bool,
    multi_valued: bool,
    advanced: bool,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    allowed_values: &'a [&'a str],
}

impl<'a> From<&'a TaskProperty> for PropertyDoc<'a> {
    fn from(p: &'a TaskProperty) -> Self {
        Self {
            attribute: p.attribute_name(),
            display_name: p.display_name(),
            description: p.description(),
            kind: p.kind().as_str(),
            required: p.is_required(),
            multi_valued: p.is_multi_valued(),
            advanced: p.is_advanced(),
            allowed_values: p.allowed_values(),
        }
    }
}

#[derive(Serialize)]
struct DecodedTask {
    dn: String,
    class_name: String,
    properties: serde_json::Value,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.base_dn)?;
    debug!(base_dn = %config.tasks_base_dn, "codec configuration");

    let output = match cli.command {
        Command::Classes => list_classes(),
        Command::Properties { class, format } => list_properties(class.as_deref(), format)?,
        Command::Encode {
            class,
            input,
            format,
        } => encode(&class, &read_input(&input)?, format, &config)?,
        Command::Decode { input } => decode(&read_input(&input)?)?,
    };
    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&Path>, base_dn: Option<String>) -> Result<CodecConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => CodecConfig::default(),
    };
    if let Some(base_dn) = base_dn {
        config.tasks_base_dn = base_dn;
    }
    Ok(config)
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read standard input")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn list_classes() -> String {
    task::registry::variants()
        .iter()
        .map(|v: &VariantEntry| format!("{}\t{}\t{}", v.class_name(), v.object_class(), v.task_name()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn catalogue(class: Option<&str>) -> Result<&'static [&'static TaskProperty]> {
    match class {
        None => Ok(Task::common_task_properties()),
        Some(class) => task::properties_for_class(class)
            .ok_or_else(|| anyhow!("unknown task class '{class}'")),
    }
}

fn list_properties(class: Option<&str>, format: Format) -> Result<String> {
    let properties = catalogue(class)?;
    match format {
        Format::Json => {
            let docs: Vec<PropertyDoc<'_>> = properties.iter().map(|p| PropertyDoc::from(*p)).collect();
            Ok(serde_json::to_string_pretty(&docs)?)
        }
        Format::Text => Ok(properties
            .iter()
            .map(|p| {
                let mut flags = Vec::new();
                if p.is_required() {
                    flags.push("required");
                }
                if p.is_multi_valued() {
                    flags.push("multi-valued");
                }
                if p.is_advanced() {
                    flags.push("advanced");
                }
                format!("{}\t{}\t{}", p.attribute_name(), p.kind(), flags.join(","))
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Common and class properties together; unknown classes only get the common ones.
fn full_catalogue(class: &str) -> Vec<&'static TaskProperty> {
    let mut properties = Task::common_task_properties().to_vec();
    if let Some(specific) = task::properties_for_class(class) {
        properties.extend_from_slice(specific);
    }
    properties
}

fn encode(class: &str, document: &str, format: EntryFormat, config: &CodecConfig) -> Result<String> {
    let document: serde_json::Value =
        serde_json::from_str(document).context("property document is not valid JSON")?;
    let values = PropertyValueMap::from_json(&document, &full_catalogue(class))?;
    let task = Task::decode_property_map(class, &values)?;
    info!(task_id = task.task_id(), class_name = class, "built task");

    let entry = task.to_entry_with(config);
    Ok(match format {
        EntryFormat::Ldif => entry.to_ldif(),
        EntryFormat::Json => serde_json::to_string_pretty(&entry)?,
    })
}

fn decode(entry_json: &str) -> Result<String> {
    let entry: Entry = serde_json::from_str(entry_json).context("entry is not valid JSON")?;
    let task = Task::decode_entry(&entry)?;
    let decoded = DecodedTask {
        dn: entry.dn().to_string(),
        class_name: task.class_name().to_string(),
        properties: task.task_property_values().to_json(),
    };
    Ok(serde_json::to_string_pretty(&decoded)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirtask_core::task::{SearchTask, TaskVariant};

    const SEARCH_DOC: &str = r#"{
        "ds-task-id": "search-7",
        "ds-task-search-base-dn": "dc=example,dc=com",
        "ds-task-search-scope": "wholeSubtree",
        "ds-task-search-filter": "(mail=*)",
        "ds-task-search-output-file": "/tmp/mail.ldif",
        "ds-task-search-attribute": ["mail", "cn"],
        "ds-task-alert-on-error": true,
        "ds-task-some-unknown-attribute": "ignored"
    }"#;

    #[test]
    fn encode_writes_ldif_under_the_configured_base() {
        let config = CodecConfig::with_tasks_base_dn("cn=Recurring Tasks,cn=tasks");
        let ldif = encode(SearchTask::CLASS_NAME, SEARCH_DOC, EntryFormat::Ldif, &config).unwrap();
        assert!(ldif.starts_with("dn: ds-task-id=search-7,cn=Recurring Tasks,cn=tasks\n"));
        assert!(ldif.contains("ds-task-search-scope: sub\n"));
        assert!(ldif.contains("ds-task-search-attribute: cn\n"));
        assert!(ldif.contains("ds-task-alert-on-error: true\n"));
        assert!(!ldif.contains("unknown"));
    }

    #[test]
    fn encode_reports_missing_required_properties() {
        let err = encode(
            SearchTask::CLASS_NAME,
            r#"{"ds-task-search-base-dn": "dc=example,dc=com"}"#,
            EntryFormat::Ldif,
            &CodecConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("ds-task-search-scope"));
    }

    #[test]
    fn decode_inverts_encode() {
        let json = encode(
            SearchTask::CLASS_NAME,
            SEARCH_DOC,
            EntryFormat::Json,
            &CodecConfig::default(),
        )
        .unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&decode(&json).unwrap()).unwrap();
        assert_eq!(decoded["class_name"], SearchTask::CLASS_NAME);
        assert_eq!(decoded["properties"]["ds-task-id"][0], "search-7");
        assert_eq!(decoded["properties"]["ds-task-search-attribute"][1], "cn");
    }

    #[test]
    fn property_listing_knows_classes() {
        assert!(list_properties(Some("com.example.Nope"), Format::Text).is_err());
        let text = list_properties(Some(SearchTask::CLASS_NAME), Format::Text).unwrap();
        assert!(text.lines().any(|l| l.starts_with("ds-task-search-filter\tstring\trequired")));

        let json = list_properties(None, Format::Json).unwrap();
        let docs: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(docs.as_array().unwrap().len(), 11);
    }

    #[test]
    fn classes_are_listed_one_per_line() {
        let listing = list_classes();
        assert_eq!(listing.lines().count(), task::registry::variants().len());
        assert!(listing.contains(SearchTask::CLASS_NAME));
    }

    #[test]
    fn base_dn_flag_overrides_default() {
        let config = load_config(None, Some("cn=x".to_string())).unwrap();
        assert_eq!(config.tasks_base_dn, "cn=x");
        assert_eq!(load_config(None, None).unwrap(), CodecConfig::default());
    }
}

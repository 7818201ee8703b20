use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use awx_client::codec::{canonical_json, canonical_json_str};
use awx_core::diagnostics::{Diagnostic, Diagnostics, Severity};
use awx_core::differ::{Diff, diff};
use awx_core::provider::{Provider, ProviderResult};
use awx_core::resource::{Resource, ResourceId, State, Value};
use awx_core::schema::ResourceSchema;
use awx_provider::AwxProvider;
use awx_provider::config::{
    ENV_ENDPOINT, ENV_INSECURE_SKIP_VERIFY, ENV_PASSWORD, ENV_PLATFORM, ENV_RETRY_COUNT,
    ENV_RETRY_DELAY_SECONDS, ENV_TOKEN, ENV_USERNAME,
};
use awx_provider::schemas::{AwxSchemaConfig, Handler, get_schema_config};

#[derive(Parser)]
#[command(name = "awx")]
#[command(about = "Manage AWX and Ansible Automation Platform objects", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings; each falls back to its environment variable
#[derive(clap::Args, Debug, Default)]
struct Connection {
    /// Controller or gateway base URL
    #[arg(long, global = true, env = ENV_ENDPOINT)]
    endpoint: Option<String>,

    /// API layout: awx, aap2.4 or aap2.5
    #[arg(long, global = true, env = ENV_PLATFORM)]
    platform: Option<String>,

    #[arg(long, global = true, env = ENV_USERNAME)]
    username: Option<String>,

    #[arg(long, global = true, env = ENV_PASSWORD, hide_env_values = true)]
    password: Option<String>,

    /// Bearer token; exclusive with username and password
    #[arg(long, global = true, env = ENV_TOKEN, hide_env_values = true)]
    token: Option<String>,

    /// Extra attempts for failed GET requests
    #[arg(long, global = true, env = ENV_RETRY_COUNT)]
    retry_count: Option<u64>,

    #[arg(long, global = true, env = ENV_RETRY_DELAY_SECONDS)]
    retry_delay_seconds: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, env = ENV_INSECURE_SKIP_VERIFY)]
    insecure_skip_verify: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read an object by its controller id
    Get {
        /// Resource type (e.g. job_template)
        resource_type: String,
        id: String,
    },
    /// Find an object by name
    Lookup {
        resource_type: String,
        name: String,

        /// Narrow the lookup, e.g. --scope organization=3
        #[arg(long = "scope", value_parser = parse_scope)]
        scope: Vec<(String, String)>,
    },
    /// Show the changes needed to reach the desired object
    Plan {
        /// Desired object as JSON
        #[arg(short, long, default_value = "desired.json")]
        file: PathBuf,
    },
    /// Create or update the object to match the desired file
    Apply {
        #[arg(short, long, default_value = "desired.json")]
        file: PathBuf,
    },
    /// Delete an object by its controller id
    Delete { resource_type: String, id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let ctx = CancellationToken::new();
    let on_interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, cancelling...".yellow());
            on_interrupt.cancel();
        }
    });

    let mut diags = Diagnostics::new();
    let result = match cli.command {
        Commands::Get { resource_type, id } => {
            debug!("get {} {}", resource_type, id);
            run_get(&cli.connection, &ctx, &mut diags, &resource_type, &id).await
        }
        Commands::Lookup {
            resource_type,
            name,
            scope,
        } => {
            debug!("lookup {} {}", resource_type, name);
            run_lookup(&cli.connection, &ctx, &mut diags, &resource_type, &name, &scope).await
        }
        Commands::Plan { file } => {
            debug!("plan {}", file.display());
            run_plan(&cli.connection, &ctx, &mut diags, &file).await
        }
        Commands::Apply { file } => {
            debug!("apply {}", file.display());
            run_apply(&cli.connection, &ctx, &mut diags, &file).await
        }
        Commands::Delete { resource_type, id } => {
            debug!("delete {} {}", resource_type, id);
            run_delete(&cli.connection, &ctx, &mut diags, &resource_type, &id).await
        }
    };
    if let Err(e) = result {
        diags.error("Invalid input", e);
    }

    print_diagnostics(&diags);
    if diags.has_errors() {
        std::process::exit(1);
    }
}

// =============================================================================
// Setup
// =============================================================================

impl Connection {
    /// Provider block built from the flags; unset flags are left to the environment
    fn attributes(&self) -> HashMap<String, Value> {
        let mut attributes = HashMap::new();
        let strings = [
            ("endpoint", &self.endpoint),
            ("platform", &self.platform),
            ("username", &self.username),
            ("password", &self.password),
            ("token", &self.token),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                attributes.insert(key.to_string(), Value::from(value.as_str()));
            }
        }
        let numbers = [
            ("retry_count", self.retry_count),
            ("retry_delay_seconds", self.retry_delay_seconds),
        ];
        for (key, value) in numbers {
            if let Some(value) = value {
                attributes.insert(key.to_string(), Value::from(value.to_string()));
            }
        }
        if self.insecure_skip_verify {
            attributes.insert("insecure_skip_verify".to_string(), Value::Bool(true));
        }
        attributes
    }

    fn provider(&self) -> ProviderResult<AwxProvider> {
        AwxProvider::from_attributes(&self.attributes())
    }
}

fn schema_config(resource_type: &str) -> Result<&'static AwxSchemaConfig, String> {
    get_schema_config(resource_type).ok_or_else(|| {
        format!(
            "Unknown resource type '{}'. Known types: {}",
            resource_type,
            known_types().join(", ")
        )
    })
}

fn known_types() -> Vec<String> {
    let mut names: Vec<String> = awx_provider::schemas::configs()
        .iter()
        .map(|c| c.resource_type().to_string())
        .collect();
    names.sort();
    names
}

fn parse_scope(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Scope values that look like ids are sent as ids
fn scope_value(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::Int)
        .unwrap_or_else(|_| Value::from(raw))
}

// =============================================================================
// Desired file
// =============================================================================

/// One desired object as written by the user
#[derive(Debug, Deserialize)]
struct DesiredFile {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    /// Controller id of an object created earlier
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    attributes: serde_json::Map<String, JsonValue>,
}

impl DesiredFile {
    fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    fn identifier(&self) -> Result<Option<String>, String> {
        match &self.id {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) if !s.is_empty() => Ok(Some(s.clone())),
            Some(JsonValue::Number(n)) if n.is_u64() => Ok(Some(n.to_string())),
            Some(other) => Err(format!("'id' must be a numeric id, got {}", other)),
        }
    }

    /// Convert to a resource; JSON documents, inline or as text, become canonical text
    fn to_resource(&self, schema: &ResourceSchema) -> Resource {
        let mut resource = Resource::new(&self.resource_type, &self.name);
        for (key, value) in &self.attributes {
            let is_json = schema
                .get(key)
                .is_some_and(|attr| attr.attr_type.is_json());
            let converted = match value {
                JsonValue::Object(_) | JsonValue::Array(_) if is_json => {
                    Some(Value::String(canonical_json(value)))
                }
                JsonValue::String(text) if is_json => Some(Value::String(
                    canonical_json_str(text).unwrap_or_else(|_| text.clone()),
                )),
                _ => Value::from_json(value),
            };
            if let Some(converted) = converted {
                resource.attributes.insert(key.clone(), converted);
            }
        }
        resource
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn run_get(
    connection: &Connection,
    ctx: &CancellationToken,
    diags: &mut Diagnostics,
    resource_type: &str,
    id: &str,
) -> Result<(), String> {
    schema_config(resource_type)?;
    let Some(provider) = diags.report(connection.provider()) else {
        return Ok(());
    };
    let resource_id = ResourceId::new(resource_type, id);
    let prior = State::existing(resource_id.clone(), HashMap::new()).with_identifier(id);

    if let Some(state) = diags.report(provider.read(ctx, &resource_id, &prior).await) {
        print_state(&state)?;
    }
    Ok(())
}

async fn run_lookup(
    connection: &Connection,
    ctx: &CancellationToken,
    diags: &mut Diagnostics,
    resource_type: &str,
    name: &str,
    scope: &[(String, String)],
) -> Result<(), String> {
    let config = schema_config(resource_type)?;
    let lookup = config
        .lookup
        .ok_or_else(|| format!("{} cannot be looked up by name", resource_type))?;
    let Some(provider) = diags.report(connection.provider()) else {
        return Ok(());
    };

    let mut query = Resource::new(resource_type, name)
        .with_attribute(lookup.field, name)
        .with_read_only(true);
    for (key, value) in scope {
        query.attributes.insert(key.clone(), scope_value(value));
    }
    debug!("Looking up {} by {} with {} scope filters", resource_type, lookup.field, scope.len());

    if let Some(state) = diags.report(provider.read_data_source(ctx, &query).await) {
        print_state(&state)?;
    }
    Ok(())
}

/// Desired resource, provider and the diff between them
struct Planned {
    provider: AwxProvider,
    plan: Diff,
}

async fn plan_file(
    connection: &Connection,
    ctx: &CancellationToken,
    diags: &mut Diagnostics,
    file: &Path,
) -> Result<Option<Planned>, String> {
    let desired = DesiredFile::load(file)?;
    let config = schema_config(&desired.resource_type)?;
    let resource = desired.to_resource(&config.schema);
    info!(
        "Loaded {} from {} ({} attributes)",
        resource.id,
        file.display(),
        resource.attributes.len()
    );
    validate(config, &resource)?;

    let Some(provider) = diags.report(connection.provider()) else {
        return Ok(None);
    };
    let Some(current) = current_state(&provider, ctx, diags, config, &desired, &resource).await?
    else {
        return Ok(None);
    };
    let plan = diff(&resource, &current, Some(&config.schema));
    print_diff(&plan, &config.schema);
    Ok(Some(Planned { provider, plan }))
}

async fn run_plan(
    connection: &Connection,
    ctx: &CancellationToken,
    diags: &mut Diagnostics,
    file: &Path,
) -> Result<(), String> {
    plan_file(connection, ctx, diags, file).await?;
    Ok(())
}

async fn run_apply(
    connection: &Connection,
    ctx: &CancellationToken,
    diags: &mut Diagnostics,
    file: &Path,
) -> Result<(), String> {
    let Some(Planned { provider, plan }) = plan_file(connection, ctx, diags, file).await? else {
        return Ok(());
    };

    let result = match &plan {
        Diff::NoChange(id) | Diff::Delete(id) => {
            info!("Nothing to apply for {}", id);
            return Ok(());
        }
        Diff::Create(r) => provider.create(ctx, r).await,
        Diff::Update { id, from, to, .. } => provider.update(ctx, id, from, to).await,
    };
    let Some(state) = diags.report(result) else {
        return Ok(());
    };

    println!();
    println!(
        "  {} {} (id {})",
        "✓".green(),
        state.id,
        state.identifier.as_deref().unwrap_or("?")
    );
    Ok(())
}

async fn run_delete(
    connection: &Connection,
    ctx: &CancellationToken,
    diags: &mut Diagnostics,
    resource_type: &str,
    id: &str,
) -> Result<(), String> {
    let config = schema_config(resource_type)?;
    let Some(provider) = diags.report(connection.provider()) else {
        return Ok(());
    };
    let resource_id = ResourceId::new(resource_type, id);
    let prior = State::existing(resource_id.clone(), HashMap::new()).with_identifier(id);

    let Some(state) = diags.report(provider.read(ctx, &resource_id, &prior).await) else {
        return Ok(());
    };
    if !state.exists {
        println!("{}", format!("{} {} does not exist.", resource_type, id).yellow());
        return Ok(());
    }

    if diags
        .report(provider.delete(ctx, &resource_id, &state).await)
        .is_none()
    {
        return Ok(());
    }
    if config.handler == Handler::Label {
        label_kept(diags, resource_type, id);
    } else {
        println!("  {} {} {} deleted", "✓".green(), resource_type, id);
    }
    Ok(())
}

/// The controller offers no DELETE for labels; the object stays
fn label_kept(diags: &mut Diagnostics, resource_type: &str, id: &str) {
    diags.warning(
        "Label not deleted",
        format!(
            "{} {} is left on the controller: labels cannot be deleted through the API",
            resource_type, id
        ),
    )
}

fn validate(config: &AwxSchemaConfig, resource: &Resource) -> Result<(), String> {
    config.schema.validate(&resource.attributes).map_err(|errors| {
        errors
            .iter()
            .map(|e| format!("{}: {}", resource.id, e))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// State of the desired object: read by id, else found by name, else absent
///
/// `None` when a provider error was reported.
async fn current_state(
    provider: &AwxProvider,
    ctx: &CancellationToken,
    diags: &mut Diagnostics,
    config: &AwxSchemaConfig,
    desired: &DesiredFile,
    resource: &Resource,
) -> Result<Option<State>, String> {
    let identifier = match desired.identifier()? {
        Some(identifier) => Some(identifier),
        None => match config.lookup {
            Some(lookup) if resource.get(lookup.field).is_some() => {
                let mut query = Resource::new(&desired.resource_type, &desired.name)
                    .with_read_only(true);
                let keys =
                    std::iter::once(lookup.field).chain(lookup.scope.iter().map(|(k, _)| *k));
                for key in keys {
                    if let Some(value) = resource.get(key) {
                        query.attributes.insert(key.to_string(), value.clone());
                    }
                }
                let Some(found) = diags.report(provider.read_data_source(ctx, &query).await)
                else {
                    return Ok(None);
                };
                found.identifier
            }
            _ => None,
        },
    };

    let Some(identifier) = identifier else {
        debug!("{} has no id and was not found, planning a create", resource.id);
        return Ok(Some(State::not_found(resource.id.clone())));
    };
    let prior =
        State::existing(resource.id.clone(), resource.attributes.clone()).with_identifier(identifier);
    Ok(diags.report(provider.read(ctx, &resource.id, &prior).await))
}

// =============================================================================
// Output
// =============================================================================

/// `summary (attribute): detail`
fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    match &diagnostic.attribute {
        Some(attribute) => format!(
            "{} ({}): {}",
            diagnostic.summary, attribute, diagnostic.detail
        ),
        None => format!("{}: {}", diagnostic.summary, diagnostic.detail),
    }
}

fn print_diagnostics(diags: &Diagnostics) {
    for diagnostic in diags.iter() {
        let label = match diagnostic.severity {
            Severity::Error => "Error:".red().bold(),
            Severity::Warning => "Warning:".yellow().bold(),
        };
        eprintln!("{} {}", label, render_diagnostic(diagnostic));
    }
}

fn print_state(state: &State) -> Result<(), String> {
    if !state.exists {
        return Err(format!("{} not found", state.id));
    }
    let object: serde_json::Map<String, JsonValue> = state
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    let rendered =
        serde_json::to_string_pretty(&JsonValue::Object(object)).map_err(|e| e.to_string())?;
    println!("{}", rendered);
    Ok(())
}

fn format_value(schema: &ResourceSchema, key: &str, value: &Value) -> String {
    if schema.get(key).is_some_and(|attr| attr.sensitive) {
        return "(sensitive)".to_string();
    }
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_json().to_string(),
    }
}

fn sorted_keys<'a>(attributes: impl Iterator<Item = &'a String>) -> Vec<&'a String> {
    let mut keys: Vec<&String> = attributes.collect();
    keys.sort();
    keys
}

fn print_diff(plan: &Diff, schema: &ResourceSchema) {
    match plan {
        Diff::NoChange(id) => {
            println!("{}", format!("No changes. {} is up-to-date.", id).green());
        }
        Diff::Create(resource) => {
            println!("{}", "Execution Plan:".cyan().bold());
            println!();
            println!("  {} {}", "+".green().bold(), resource.id.to_string().green());
            for key in sorted_keys(resource.attributes.keys()) {
                println!(
                    "      {}: {}",
                    key,
                    format_value(schema, key, &resource.attributes[key])
                );
            }
        }
        Diff::Update {
            id,
            from,
            to,
            changed_attributes,
        } => {
            println!("{}", "Execution Plan:".cyan().bold());
            println!();
            println!("  {} {}", "~".yellow().bold(), id.to_string().yellow());
            let mut changed = changed_attributes.clone();
            changed.sort();
            for key in changed {
                let old = from
                    .get(&key)
                    .map(|v| format_value(schema, &key, v))
                    .unwrap_or_else(|| "(unset)".to_string());
                let new = to
                    .get(&key)
                    .map(|v| format_value(schema, &key, v))
                    .unwrap_or_else(|| "(unset)".to_string());
                println!("      {}: {} → {}", key, old.red(), new.green());
            }
        }
        Diff::Delete(id) => {
            println!("  {} {}", "-".red().bold(), id.to_string().red());
        }
    }
}

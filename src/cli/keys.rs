use crate::cli::CliContext;
use crate::constants;
use crate::core::dispatch::{Dispatcher, FanOut, RequestFailure};
use crate::models::config::ConfigFile;
use crate::models::key::Key;
use crate::models::provider::Provider;
use crate::util::fs as keys_fs;
use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use std::io::Write;
use std::path::PathBuf;

const MINUTES_PER_DAY: f64 = 60.0 * 24.0;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Include inactive keys (also enabled by settings.include_inactive)
    #[arg(long)]
    pub include_inactive: bool,

    /// Keep going when a provider request fails and report failures at the end
    #[arg(long)]
    pub best_effort: bool,

    /// Query providers concurrently
    #[arg(long)]
    pub concurrent: bool,

    /// Output format: table|json
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Provider name (aws|gcp|aiven)
    #[arg(long)]
    pub provider: String,

    /// Provider scope (GCP project)
    #[arg(long, default_value = "")]
    pub scope: String,

    /// Account to create the key for (IAM user, service account, or
    /// `<prefix>-<description>` for Aiven)
    #[arg(long)]
    pub account: String,

    /// Environment variable holding the provider credential
    #[arg(long, value_name = "VAR")]
    pub credential_env: Option<String>,

    /// Write the secret to this file (mode 0600)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Allow printing the secret to stdout
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Provider name (aws|gcp|aiven)
    #[arg(long)]
    pub provider: String,

    /// Provider scope (GCP project)
    #[arg(long, default_value = "")]
    pub scope: String,

    /// Full account of the key, as shown by `list --format json`
    #[arg(long)]
    pub account: String,

    /// Key id
    #[arg(long)]
    pub id: String,

    /// Environment variable holding the provider credential
    #[arg(long, value_name = "VAR")]
    pub credential_env: Option<String>,
}

/// Build the request for a single-key command.
///
/// An explicit `--credential-env` wins; otherwise the credential of the
/// matching `[[providers]]` entry is used, if any.
fn single_request(
    config: &ConfigFile,
    provider: &str,
    scope: &str,
    credential_env: Option<&str>,
) -> Result<Provider> {
    if let Some(var) = credential_env {
        let credential = std::env::var(var)
            .with_context(|| format!("credential variable {} is not set", var))?;
        return Ok(Provider::new(provider, scope).with_credential(credential));
    }
    match config
        .providers
        .iter()
        .find(|entry| entry.provider == provider && entry.scope == scope)
    {
        Some(entry) => Ok(entry.to_request()?),
        None => Ok(Provider::new(provider, scope)),
    }
}

fn days(minutes: f64) -> String {
    format!("{:.1}", minutes / MINUTES_PER_DAY)
}

fn render_table(keys: &[Key]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Provider").add_attribute(Attribute::Bold),
        Cell::new("Scope").add_attribute(Attribute::Bold),
        Cell::new("Account").add_attribute(Attribute::Bold),
        Cell::new("Name").add_attribute(Attribute::Bold),
        Cell::new("ID").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Age (days)").add_attribute(Attribute::Bold),
        Cell::new("Life remaining (days)").add_attribute(Attribute::Bold),
    ]);

    for key in keys {
        let scope = if key.provider.scope.is_empty() {
            "-".to_string()
        } else {
            key.provider.scope.clone()
        };
        let life_remaining = if key.life_remaining > 0.0 {
            days(key.life_remaining)
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            key.provider.provider.clone(),
            scope,
            key.account.clone(),
            key.name.clone(),
            key.id.clone(),
            key.status.to_string(),
            days(key.age),
            life_remaining,
        ]);
    }
    table
}

pub fn run_list(ctx: &CliContext, args: ListArgs) -> Result<()> {
    if args.format != "table" && args.format != "json" {
        bail!("invalid format: {} (use table|json)", args.format);
    }

    let requests = ctx.config.requests()?;
    if requests.is_empty() {
        bail!(
            "no providers configured (add [[providers]] entries to {})",
            ctx.config_path.display()
        );
    }

    let include_inactive = args.include_inactive || ctx.config.settings.include_inactive;
    let fan_out = if args.concurrent {
        FanOut::Concurrent
    } else {
        ctx.config.settings.fan_out
    };
    let dispatcher = Dispatcher::new(&ctx.registry).with_fan_out(fan_out);

    let (keys, failures) = if args.best_effort {
        let inventory = dispatcher.inventory(&requests, include_inactive);
        (inventory.keys, inventory.failures)
    } else {
        (dispatcher.keys(&requests, include_inactive)?, Vec::new())
    };

    if args.format == "json" {
        let json = serde_json::to_string_pretty(&keys).context("serialize keys")?;
        println!("{}", json);
    } else if keys.is_empty() {
        println!("No keys found");
    } else {
        println!("{}", render_table(&keys));
    }

    report_failures(&failures, requests.len())
}

fn report_failures(failures: &[RequestFailure], total: usize) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    for failure in failures {
        eprintln!("warning: {}: {}", failure.provider, failure.error);
    }
    bail!(
        "inventory incomplete: {} of {} provider requests failed",
        failures.len(),
        total
    )
}

pub fn run_create(ctx: &CliContext, args: CreateArgs) -> Result<()> {
    if args.output.is_none() && !args.confirm {
        bail!("refusing to print secret to stdout without --confirm (or use --output)");
    }

    let request = single_request(
        &ctx.config,
        &args.provider,
        &args.scope,
        args.credential_env.as_deref(),
    )?;
    let created = Dispatcher::new(&ctx.registry).create_key_from_scratch(&request, &args.account)?;

    if let Some(output) = args.output {
        keys_fs::write_secret(&output, &created.secret, constants::SECRET_FILE_MODE).with_context(
            || format!("key {} was created but its secret could not be saved", created.id),
        )?;
        println!("Created key {} for {}", created.id, args.account);
        println!("Wrote {}", output.display());
        return Ok(());
    }

    eprintln!("Created key {} for {}", created.id, args.account);
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", created.secret.as_str()).context("write to stdout")?;
    stdout.flush().context("flush stdout")?;
    Ok(())
}

pub fn run_delete(ctx: &CliContext, args: DeleteArgs) -> Result<()> {
    let request = single_request(
        &ctx.config,
        &args.provider,
        &args.scope,
        args.credential_env.as_deref(),
    )?;
    Dispatcher::new(&ctx.registry).delete_key_by_id(&request, &args.account, &args.id)?;
    println!("Deleted key {} of {}", args.id, args.account);
    Ok(())
}

pub fn run_providers(ctx: &CliContext) -> Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Provider").add_attribute(Attribute::Bold),
        Cell::new("Configured scopes").add_attribute(Attribute::Bold),
    ]);
    for name in ctx.registry.names() {
        let scopes: Vec<&str> = ctx
            .config
            .providers
            .iter()
            .filter(|entry| entry.provider == name)
            .map(|entry| if entry.scope.is_empty() { "(default)" } else { entry.scope.as_str() })
            .collect();
        let scopes = if scopes.is_empty() {
            "-".to_string()
        } else {
            scopes.join(",")
        };
        table.add_row(vec![name.to_string(), scopes]);
    }
    println!("{}", table);
    Ok(())
}

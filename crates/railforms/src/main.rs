//! `railforms` - CLI for railway maintenance form records
//!
//! This binary provides the command-line interface for migrating the
//! database and creating, listing, updating and deleting form records.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use serde::de::DeserializeOwned;

use railforms::cli::{
    render_kinds, render_record, render_records, Cli, Command, ConfigCommand, CreateCommand,
    DeleteCommand, GetCommand, ListCommand, UpdateCommand,
};
use railforms::{
    init_logging, Config, Error, FormRecordUpdate, FormRegistry, NewFormRecord, Storage,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Migrate => handle_migrate(&config),
        Command::Kinds(cmd) => {
            println!("{}", render_kinds(&FormRegistry::builtin(), cmd.json)?);
            Ok(())
        }
        Command::Create(cmd) => handle_create(&config, &cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Get(cmd) => handle_get(&config, &cmd),
        Command::Update(cmd) => handle_update(&config, &cmd),
        Command::Delete(cmd) => handle_delete(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_migrate(config: &Config) -> anyhow::Result<()> {
    let storage = Storage::create_with_config(config)?;
    println!(
        "Database ready at {} (schema version {})",
        storage.path().display(),
        storage.schema_version()?.unwrap_or_default()
    );
    Ok(())
}

fn handle_create(config: &Config, cmd: &CreateCommand) -> anyhow::Result<()> {
    let record: NewFormRecord = read_payload(cmd.file.as_deref())?;
    let storage = Storage::open_with_config(config)?;
    let created = storage.records(&cmd.kind)?.create(&record)?;
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let storage = Storage::open_with_config(config)?;
    let records = storage.records(&cmd.kind)?.list(&cmd.filter(), cmd.page())?;
    let rendered = render_records(&records, cmd.format)?;
    if !rendered.is_empty() {
        println!("{rendered}");
    }
    Ok(())
}

fn handle_get(config: &Config, cmd: &GetCommand) -> anyhow::Result<()> {
    let storage = Storage::open_with_config(config)?;
    let store = storage.records(&cmd.kind)?;
    let record = store
        .get(cmd.id)?
        .ok_or_else(|| Error::not_found(store.kind(), cmd.id))?;
    println!("{}", render_record(&record, cmd.format)?);
    Ok(())
}

fn handle_update(config: &Config, cmd: &UpdateCommand) -> anyhow::Result<()> {
    let update: FormRecordUpdate = read_payload(cmd.file.as_deref())?;
    let storage = Storage::open_with_config(config)?;
    let store = storage.records(&cmd.kind)?;
    let updated = store
        .update(cmd.id, &update)?
        .ok_or_else(|| Error::not_found(store.kind(), cmd.id))?;
    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}

fn handle_delete(config: &Config, cmd: &DeleteCommand) -> anyhow::Result<()> {
    let storage = Storage::open_with_config(config)?;
    let store = storage.records(&cmd.kind)?;
    if !store.delete(cmd.id)? {
        return Err(Error::not_found(store.kind(), cmd.id).into());
    }
    println!("Deleted {} {}", store.kind(), cmd.id);
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let database_path = config.database_path();
    let stats = match Storage::open_with_config(config) {
        Ok(storage) => Some(storage.stats()?),
        Err(Error::SchemaNotInitialized { .. }) => None,
        Err(e) => return Err(e.into()),
    };

    if json {
        let status = match &stats {
            Some(stats) => {
                let by_kind: serde_json::Map<String, serde_json::Value> = stats
                    .records_by_kind
                    .iter()
                    .map(|(kind, count)| (kind.clone(), serde_json::json!(count)))
                    .collect();
                serde_json::json!({
                    "database_path": database_path,
                    "initialized": true,
                    "schema_version": stats.schema_version,
                    "total_records": stats.total_records,
                    "records_by_kind": by_kind,
                    "db_size_bytes": stats.db_size_bytes,
                })
            }
            None => serde_json::json!({
                "database_path": database_path,
                "initialized": false,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("railforms status");
        println!("----------------");
        println!("Database:      {}", database_path.display());
        match stats {
            Some(stats) => {
                println!(
                    "Schema:        version {}",
                    stats.schema_version.unwrap_or_default()
                );
                println!("Size:          {} bytes", stats.db_size_bytes);
                println!("Records:       {}", stats.total_records);
                for (kind, count) in &stats.records_by_kind {
                    println!("  {kind:<24} {count}");
                }
            }
            None => println!("Schema:        not initialized (run `railforms migrate`)"),
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Busy timeout (ms):  {}", config.storage.busy_timeout_ms);
                println!();
                println!("[Listing]");
                println!("  Default limit:      {}", config.listing.default_limit);
                println!("  Max limit:          {}", config.listing.max_limit);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

/// Read a JSON document from `file`, or from stdin when no file is given.
fn read_payload<T: DeserializeOwned>(file: Option<&Path>) -> anyhow::Result<T> {
    let (source, text) = match file {
        Some(path) => (
            path.display().to_string(),
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            ("stdin".to_string(), text)
        }
    };
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {source}"))
}

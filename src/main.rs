mod config;
mod entry;
mod merge;
mod relay;
mod session;
mod store;
mod telemetry;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use tracing::debug;

use config::Config;
use merge::{resolve_target_index, MergeOutcome};
use session::AuthorSearchSession;
use store::{FieldKind, JsonRecordStore, RecordStore};

#[derive(Parser, Debug)]
#[command(name = "authslot")]
struct Cli {
    /// Configuration file (defaults to <config dir>/authslot/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration file
    Init(InitArgs),
    /// Merge a selected author into a field of the record
    Apply(ApplyArgs),
    /// Print the current value of a field, or one entry of a list field
    Show(ShowArgs),
    /// List the author slots of a list field and the next target
    Slots(FieldArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Record store to put in the generated configuration
    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,

    /// Overwrite an existing configuration file
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["payload", "payload_file"])))]
struct ApplyArgs {
    #[arg(long)]
    field: String,

    /// Treat the field as a list of author entries
    #[arg(long, conflicts_with = "single")]
    list: bool,

    /// Treat the field as a single author entry
    #[arg(long)]
    single: bool,

    /// Selected author as JSON
    #[arg(long)]
    payload: Option<String>,

    /// Read the selected author JSON from a file, or `-` for stdin
    #[arg(long, value_name = "PATH")]
    payload_file: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    #[arg(long)]
    field: String,

    /// Print only the entry at this position of a list field
    #[arg(long)]
    index: Option<usize>,

    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FieldArgs {
    #[arg(long)]
    field: String,

    #[arg(long, value_name = "PATH")]
    store: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match cli.command {
        Command::Init(args) => handle_init(args, cli.config.as_deref()),
        Command::Apply(args) => {
            let config = config::load(cli.config.as_deref())?;
            handle_apply(args, &config)
        }
        Command::Show(args) => {
            let config = config::load(cli.config.as_deref())?;
            handle_show(args, &config)
        }
        Command::Slots(args) => {
            let config = config::load(cli.config.as_deref())?;
            handle_slots(args, &config)
        }
    }
}

fn handle_init(args: InitArgs, explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config::default_config_path()?,
    };
    config::write_default(&path, args.store.as_deref(), args.force)?;
    println!("Wrote configuration to {}", path.display());
    Ok(())
}

fn handle_apply(args: ApplyArgs, config: &Config) -> Result<()> {
    let mut store = open_store(args.store.as_deref(), config)?;

    let kind = if args.list {
        FieldKind::List
    } else if args.single {
        FieldKind::Single
    } else {
        config
            .field_kind(&args.field)
            .or_else(|| store.get(&args.field).map(FieldKind::of_value))
            .unwrap_or(FieldKind::Single)
    };
    debug!(field = %args.field, ?kind, "resolved field kind");

    let mut session = AuthorSearchSession::new();
    session.trigger(&args.field, kind.is_list());

    // An unreadable payload closes the request without a selection.
    let payload = match read_payload(&args) {
        Ok(payload) => payload,
        Err(err) => {
            session.dismiss();
            return Err(err);
        }
    };
    session.select(&payload);
    debug!(phase = ?session.phase(), pending = ?session.pending(), "selection captured");

    let outcome = session
        .confirm(&mut store, &config.author)
        .with_context(|| format!("failed to apply author selection to `{}`", args.field))?;

    match outcome {
        Some(MergeOutcome::Replaced) => println!("Replaced {}", args.field),
        Some(MergeOutcome::Slot(target)) => {
            if target.gap_found {
                println!("Updated {}[{}]", args.field, target.index);
            } else {
                println!(
                    "Updated {}[{}] (no empty slot; first entry overwritten)",
                    args.field, target.index
                );
            }
        }
        None => {
            println!("Nothing to apply");
            return Ok(());
        }
    }

    store.save()
}

fn handle_show(args: ShowArgs, config: &Config) -> Result<()> {
    let store = open_store(args.store.as_deref(), config)?;
    let value = match args.index {
        Some(index) => store.get_index(&args.field, index).with_context(|| {
            format!("field `{}` has no list entry at index {}", args.field, index)
        })?,
        None => store
            .get(&args.field)
            .with_context(|| format!("field `{}` not found in record", args.field))?,
    };
    let rendered = serde_json::to_string_pretty(value).context("failed to render field")?;
    println!("{}", rendered);
    Ok(())
}

fn handle_slots(args: FieldArgs, config: &Config) -> Result<()> {
    let store = open_store(args.store.as_deref(), config)?;
    let Some(value) = store.get(&args.field) else {
        bail!("field `{}` not found in record", args.field);
    };
    let Some(entries) = value.as_array() else {
        bail!("field `{}` is not a list of author entries", args.field);
    };

    if entries.is_empty() {
        println!("No slots in {}", args.field);
        return Ok(());
    }

    // index<TAB>state<TAB>name
    for (index, author) in entries.iter().enumerate() {
        let state = entry::classify(author, &config.author);
        let name = entry::display_name(author, &config.author).unwrap_or_default();
        println!("{}\t{}\t{}", index, state.label(), name);
    }

    let target = resolve_target_index(entries, &config.author);
    if target.gap_found {
        println!("next: {}", target.index);
    } else {
        println!("next: {} (no empty slot; first entry will be overwritten)", target.index);
    }
    Ok(())
}

fn open_store(explicit: Option<&Path>, config: &Config) -> Result<JsonRecordStore> {
    let path = match explicit.or(config.store.as_deref()) {
        Some(path) => path,
        None => bail!("no record store given; pass --store or set `store` in the configuration"),
    };
    let store = JsonRecordStore::open(path)?.with_schema(config.fields.keys().cloned());
    debug!(
        path = %path.display(),
        config = ?config.config_path,
        "opened record store"
    );
    Ok(store)
}

fn read_payload(args: &ApplyArgs) -> Result<String> {
    if let Some(payload) = &args.payload {
        return Ok(payload.clone());
    }

    match args.payload_file.as_deref() {
        Some(path) if path == Path::new("-") => {
            io::read_to_string(io::stdin()).context("failed to read payload from stdin")
        }
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read payload file {}", path.display())),
        None => bail!("either --payload or --payload-file is required"),
    }
}

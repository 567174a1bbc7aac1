//! CLI tool for managing multi-curve logs in a local store.

mod error;
mod render;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use curvelog_core::{
    IndexMode, IndexValue, LogHeader, LogStore, LogUri, StoreOptions,
    notify::ChangeNotification,
    store::{CurveSelector, DeleteRequest},
};
use log::debug;
use snafu::{OptionExt, ResultExt};

use crate::error::{
    CliResult, InvalidBoundSnafu, InvalidCurveSelectorSnafu, ParseInputSnafu, ReadInputSnafu,
    RenderSnafu, StoreSnafu,
};

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a log from a JSON header (with optional data)
    Add { file: PathBuf },

    /// Merge a JSON header and its data into an existing log
    Update { file: PathBuf },

    /// Overwrite an existing log with a JSON header and its data
    Replace { file: PathBuf },

    /// Delete index ranges of some or all curves
    DeleteRange {
        uri: String,

        /// First bound (direction order); depth number or RFC 3339 time
        #[arg(long)]
        start: Option<String>,

        /// Last bound (direction order)
        #[arg(long)]
        end: Option<String>,

        /// Repeatable: MNEMONIC or MNEMONIC=START:END
        #[arg(long = "curve")]
        curves: Vec<String>,
    },

    /// Remove a log and all of its data
    Delete { uri: String },

    /// Print a log header as JSON
    Show {
        uri: String,

        /// JSON header template; only the fields it carries are returned
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Print a log's rows as CSV
    Data { uri: String },

    /// Print channel descriptors of a log
    Channels { uri: String },
}

#[derive(Debug, Parser)]
#[command(name = "curvelog", version)]
struct Cli {
    /// Store root directory
    #[arg(long, env = "CURVELOG_ROOT")]
    root: PathBuf,

    /// Null marker for curves and logs that define none
    #[arg(long = "default-null", env = "CURVELOG_DEFAULT_NULL")]
    default_null: Option<String>,

    /// Decimal scale for reported depth indexes
    #[arg(long, env = "CURVELOG_SCALE", default_value_t = 3)]
    scale: u32,

    #[command(subcommand)]
    cmd: Command,
}

async fn read_header(path: &Path) -> CliResult<LogHeader> {
    let text = tokio::fs::read_to_string(path)
        .await
        .context(ReadInputSnafu {
            path: path.display().to_string(),
        })?;
    serde_json::from_str(&text).context(ParseInputSnafu {
        path: path.display().to_string(),
    })
}

fn report(verb: &str, note: &ChangeNotification) {
    println!("{verb} {} (version {})", note.uri, note.version);
}

fn parse_bound(text: &str, mode: IndexMode) -> CliResult<Option<IndexValue>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    IndexValue::parse(text, mode)
        .map(Some)
        .context(InvalidBoundSnafu { text })
}

fn parse_selector(text: &str, mode: IndexMode) -> CliResult<CurveSelector> {
    let Some((name, range)) = text.split_once('=') else {
        return Ok(CurveSelector::by_mnemonic(text.trim()));
    };
    let (min, max) = range
        .split_once(':')
        .context(InvalidCurveSelectorSnafu { text })?;
    let name = name.trim();
    snafu::ensure!(!name.is_empty(), InvalidCurveSelectorSnafu { text });
    Ok(CurveSelector::by_mnemonic(name).with_range(parse_bound(min, mode)?, parse_bound(max, mode)?))
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Add,
    Update,
    Replace,
}

impl Mutation {
    fn action(self) -> &'static str {
        match self {
            Mutation::Add => "add",
            Mutation::Update => "update",
            Mutation::Replace => "replace",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Mutation::Add => "Added",
            Mutation::Update => "Updated",
            Mutation::Replace => "Replaced",
        }
    }
}

async fn cmd_mutate(store: &LogStore, mutation: Mutation, file: &Path) -> CliResult<()> {
    let header = read_header(file).await?;
    let uri = header.uri.to_string();
    let result = match mutation {
        Mutation::Add => store.add(header).await,
        Mutation::Update => store.update(header).await,
        Mutation::Replace => store.replace(header).await,
    };
    let note = result.context(StoreSnafu {
        action: mutation.action(),
        uri,
    })?;
    report(mutation.verb(), &note);
    Ok(())
}

async fn cmd_delete_range(
    store: &LogStore,
    uri: LogUri,
    start: Option<String>,
    end: Option<String>,
    curves: Vec<String>,
) -> CliResult<()> {
    // Bounds are typed by the stored log's index axis.
    let header = store.get(&uri, None).await.context(StoreSnafu {
        action: "delete-range",
        uri: uri.to_string(),
    })?;
    let mode = header.index_mode();
    debug!("parsing delete bounds for {uri} as {mode} values");

    let mut request = DeleteRequest::new(uri.clone()).with_bounds(
        start.as_deref().map(|s| parse_bound(s, mode)).transpose()?.flatten(),
        end.as_deref().map(|s| parse_bound(s, mode)).transpose()?.flatten(),
    );
    for curve in &curves {
        request = request.with_curve(parse_selector(curve, mode)?);
    }

    match store.partial_delete(&request).await.context(StoreSnafu {
        action: "delete-range",
        uri: uri.to_string(),
    })? {
        Some(note) => report("Deleted ranges of", &note),
        None => println!("Nothing to delete in {uri}"),
    }
    Ok(())
}

async fn cmd_show(store: &LogStore, uri: LogUri, template: Option<PathBuf>) -> CliResult<()> {
    let template = match template {
        Some(path) => Some(read_header(&path).await?),
        None => None,
    };
    let header = store
        .get(&uri, template.as_ref())
        .await
        .context(StoreSnafu {
            action: "show",
            uri: uri.to_string(),
        })?;
    println!(
        "{}",
        serde_json::to_string_pretty(&header).context(RenderSnafu)?
    );
    Ok(())
}

async fn cmd_data(store: &LogStore, uri: LogUri) -> CliResult<()> {
    let ctx = || StoreSnafu {
        action: "data",
        uri: uri.to_string(),
    };
    let header = store.get(&uri, None).await.context(ctx())?;
    let rows = store.read_rows(&uri).await.context(ctx())?;
    print!("{}", render::rows_csv(&header, &rows));
    Ok(())
}

async fn cmd_channels(store: &LogStore, uri: LogUri) -> CliResult<()> {
    let (index, channels) = store
        .channel_metadata(&uri, None)
        .await
        .context(StoreSnafu {
            action: "channels",
            uri: uri.to_string(),
        })?;
    println!("{}", render::channels_table(&index, &channels));
    Ok(())
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let mut options = StoreOptions::default().with_decimal_scale(cli.scale);
    if let Some(null) = cli.default_null {
        options = options.with_default_null_value(null);
    }
    debug!("opening store at {}", cli.root.display());
    let store = LogStore::open_local(cli.root, options);

    match cli.cmd {
        Command::Add { file } => cmd_mutate(&store, Mutation::Add, &file).await,
        Command::Update { file } => cmd_mutate(&store, Mutation::Update, &file).await,
        Command::Replace { file } => cmd_mutate(&store, Mutation::Replace, &file).await,
        Command::DeleteRange {
            uri,
            start,
            end,
            curves,
        } => cmd_delete_range(&store, LogUri::new(uri), start, end, curves).await,
        Command::Delete { uri } => {
            let uri = LogUri::new(uri);
            let note = store.delete(&uri).await.context(StoreSnafu {
                action: "delete",
                uri: uri.to_string(),
            })?;
            report("Deleted", &note);
            Ok(())
        }
        Command::Show { uri, template } => cmd_show(&store, LogUri::new(uri), template).await,
        Command::Data { uri } => cmd_data(&store, LogUri::new(uri)).await,
        Command::Channels { uri } => cmd_channels(&store, LogUri::new(uri)).await,
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

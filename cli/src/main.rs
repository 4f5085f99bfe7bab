use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Args, Parser, Subcommand};
use sqlstore_core::{DataStore, DriverRegistry, Params, QueryCatalog, validate_catalog};
use sqlstore_db::{CatalogLoader, StoreConfig};
use sqlstore_sqlite::DRIVER_NAME;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sqlstore", version)]
#[command(about = "Render query catalogs and run named queries against a data store")]
struct Cli {
    /// Log filter (e.g. `warn`, `debug`, `sqlstore_sqlite=trace`); RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the SQL each query in the given catalogs renders to.
    Render(RenderArgs),
    /// Validate query catalogs and report definition problems.
    Check(CheckArgs),
    /// List registered driver names.
    Drivers,
    /// Run a SELECT query and print every row as JSON.
    Select(QueryArgs),
    /// Run a SELECT query that must return exactly one row.
    Get(QueryArgs),
    /// Run an INSERT or REPLACE query and print the new row id.
    Insert(QueryArgs),
    /// Run a non-SELECT query and print the affected row count.
    Exec(QueryArgs),
    /// Open a store and print its diagnostic summary.
    Info(StoreArgs),
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Query-definition files (JSON or YAML) or directories of them.
    #[arg(long = "queries", required = true)]
    queries: Vec<PathBuf>,
    /// Only render this query.
    #[arg(long)]
    name: Option<String>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Query-definition files (JSON or YAML) or directories of them.
    #[arg(long = "queries", required = true)]
    queries: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Store config file (YAML or JSON) naming driver, schemas and query files.
    #[arg(long, conflicts_with_all = ["driver", "dsn", "schema", "queries"])]
    config: Option<PathBuf>,
    /// Driver name (default: sqlite).
    #[arg(long)]
    driver: Option<String>,
    /// Driver config string, e.g. a database path or `:memory:`.
    #[arg(long)]
    dsn: Option<String>,
    /// Schema to register; repeatable.
    #[arg(long)]
    schema: Vec<String>,
    /// Query-definition file or directory to prepare; repeatable.
    #[arg(long)]
    queries: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct QueryArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Name of the query to run.
    #[arg(long)]
    query: String,
    /// Bind arguments as a JSON object.
    #[arg(long, default_value = "{}")]
    args: String,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli.log_level, cli.log_file.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Render(args) => run_render(args),
        Command::Check(args) => run_check(args),
        Command::Drivers => run_drivers(),
        Command::Select(args) => run_select(args),
        Command::Get(args) => run_get(args),
        Command::Insert(args) => run_insert(args),
        Command::Exec(args) => run_exec(args),
        Command::Info(args) => run_info(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| format!("Invalid log level '{level}': {err}"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| format!("Failed to open log file '{}': {err}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|err| format!("Failed to initialize logging: {err}"))
}

fn registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    sqlstore_sqlite::register(&mut registry);
    registry
}

/// Loads one catalog file, or every catalog in a directory.
fn load_catalogs(path: &Path) -> Result<Vec<QueryCatalog>, String> {
    CatalogLoader::from_path(path)
        .map_err(|err| format!("Failed to load '{}': {err}", path.display()))
}

fn run_render(args: RenderArgs) -> Result<(), String> {
    // Later files shadow earlier ones, matching store lookup order.
    let mut rendered = BTreeMap::new();
    for path in &args.queries {
        for catalog in load_catalogs(path)? {
            for (name, query) in catalog.iter() {
                let sql = match query.render() {
                    "" => "<invalid>".to_string(),
                    sql => sql.to_string(),
                };
                rendered.insert(name.to_string(), sql);
            }
        }
    }

    if let Some(name) = &args.name {
        let sql = rendered
            .get(name)
            .ok_or_else(|| format!("Query '{name}' not found"))?;
        println!("{name}\t{sql}");
        return Ok(());
    }

    for (name, sql) in &rendered {
        println!("{name}\t{sql}");
    }
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let mut issues = 0;
    let mut queries = 0;
    let mut catalogs = 0;
    for path in &args.queries {
        for catalog in load_catalogs(path)? {
            catalogs += 1;
            queries += catalog.len();
            for issue in validate_catalog(&catalog) {
                println!("{}: {issue}", path.display());
                issues += 1;
            }
        }
    }

    if issues > 0 {
        return Err(format!("{issues} issue(s) found"));
    }
    println!("Checked {catalogs} catalog(s) with {queries} query definition(s); no issues.");
    Ok(())
}

fn run_drivers() -> Result<(), String> {
    for name in registry().drivers() {
        println!("{name}");
    }
    Ok(())
}

fn open_store(args: StoreArgs) -> Result<Box<dyn DataStore>, String> {
    let config = match args.config {
        Some(path) => StoreConfig::load(&path)
            .map_err(|err| format!("Failed to load store config '{}': {err}", path.display()))?,
        None => {
            let dsn = args
                .dsn
                .ok_or("Specify a store: --config <file> or --dsn <config>")?;
            let mut config =
                StoreConfig::new(args.driver.as_deref().unwrap_or(DRIVER_NAME), dsn);
            config.schemas = args.schema;
            config.query_files = args.queries;
            config
        }
    };
    debug!(
        driver = %config.driver,
        schemas = config.schemas.len(),
        query_files = config.query_files.len(),
        "opening store"
    );
    config.open(&registry()).map_err(|err| err.to_string())
}

fn parse_params(raw: &str) -> Result<Params, String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| format!("Invalid --args JSON: {err}"))?;
    Params::from_serialize(&value).map_err(|err| err.to_string())
}

/// Opens the store, runs `op`, and closes the store whatever the outcome.
fn with_store<T>(
    args: QueryArgs,
    op: impl FnOnce(&dyn DataStore, &str, &Params) -> sqlstore_core::Result<T>,
) -> Result<T, String> {
    let params = parse_params(&args.args)?;
    let store = open_store(args.store)?;
    let result = op(store.as_ref(), &args.query, &params);
    store.close();
    result.map_err(|err| err.to_string())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|err| format!("Failed to serialize output: {err}"))?;
    println!("{raw}");
    Ok(())
}

fn run_select(args: QueryArgs) -> Result<(), String> {
    let rows = with_store(args, |store, query, params| store.select(query, params))?;
    print_json(&rows)
}

fn run_get(args: QueryArgs) -> Result<(), String> {
    let row = with_store(args, |store, query, params| store.get(query, params))?;
    print_json(&row)
}

fn run_insert(args: QueryArgs) -> Result<(), String> {
    let id = with_store(args, |store, query, params| store.insert(query, params))?;
    println!("{id}");
    Ok(())
}

fn run_exec(args: QueryArgs) -> Result<(), String> {
    let affected = with_store(args, |store, query, params| store.exec(query, params))?;
    println!("{affected}");
    Ok(())
}

fn run_info(args: StoreArgs) -> Result<(), String> {
    let store = open_store(args)?;
    println!("{store}");
    store.close();
    Ok(())
}

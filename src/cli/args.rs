use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::models::{
    GenerateConfig, IndexBackendKind, IndexConfig, SearchConfig, Section, ValidateConfig,
};
use crate::search::{DEFAULT_INDEX_DIR, DEFAULT_SQLITE_FILE};

/// Default output directory of `doxsearch generate`.
pub const DEFAULT_GENERATE_DIR: &str = "search";
/// Default bind address of `doxsearch serve`.
pub const DEFAULT_SERVE_ADDR: &str = "127.0.0.1:7878";

/// Top-level CLI entrypoint for `doxsearch`.
#[derive(Parser, Debug)]
#[command(
    name = "doxsearch",
    version,
    about = "Search, validate, index, and generate Doxygen client-side search data",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    /// Print the JSON schema versions used for `--format=json` output
    /// and exit.
    #[arg(long = "schema-version")]
    pub schema_version: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search `searchData` entries by key, name, scope, page, or section.
    Search(SearchArgs),
    /// Check search files for format and consistency problems.
    Validate(ValidateArgs),
    /// Print one search file as text, JSON, or rewritten JavaScript.
    Show(ShowArgs),
    /// Build or update an index.
    Index(IndexArgs),
    /// Inspect an existing index without modifying it.
    IndexInfo(IndexInfoArgs),
    /// Write a Doxygen search directory from a symbol table.
    Generate(GenerateArgs),
    /// Run a long-lived HTTP+JSON daemon.
    Serve(ServeArgs),
}

/// Arguments specific to the `search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query: a key prefix such as `addPart`, or fielded terms such as
    /// `name:tmp scope:ItoParticle section:functions|variables`.
    pub pattern: String,

    /// Search directories or files (defaults to current directory if omitted).
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Inclusion globs applied to candidate files.
    #[arg(long = "glob")]
    pub globs: Vec<String>,

    /// Exclusion globs applied to candidate files.
    #[arg(long = "exclude")]
    pub exclude_globs: Vec<String>,

    /// Restrict hits to these sections (comma-separated or repeated).
    #[arg(long = "section", value_delimiter = ',')]
    pub sections: Vec<Section>,

    /// Require exact stem matches for bare and `key:` terms.
    #[arg(long = "literal")]
    pub literal: bool,

    /// Maximum number of hits to return.
    #[arg(long = "limit")]
    pub limit: Option<usize>,

    /// Search an index instead of reading the files directly.
    ///
    /// Falls back to the files when the index does not exist or holds
    /// nothing for the requested paths.
    #[arg(long = "use-index")]
    pub use_index: bool,

    /// Rebuild or update the configured index before searching it.
    #[arg(long = "reindex-on-search")]
    pub reindex_on_search: bool,

    /// Index backend to use when `--use-index` is enabled.
    ///
    /// When omitted, an existing SQLite index at the default path is
    /// preferred over the file backend.
    #[arg(long = "index-backend", value_enum)]
    pub index_backend: Option<IndexBackendArg>,

    /// Location for on-disk index data used with `--use-index`.
    #[arg(long = "index-path")]
    pub index_path: Option<PathBuf>,

    /// Output format (text, table, or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating search to a daemon.
    ///
    /// When set (either via this flag or the `DOXSEARCH_SERVER_URL`
    /// environment variable), the CLI sends the search configuration
    /// to the HTTP server instead of running a local search. Use
    /// `--no-server` to override this and force local execution.
    #[arg(long = "server", env = "DOXSEARCH_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force local search.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Search directories or files (defaults to current directory if omitted).
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Inclusion globs applied to candidate files.
    #[arg(long = "glob")]
    pub globs: Vec<String>,

    /// Exclusion globs applied to candidate files.
    #[arg(long = "exclude")]
    pub exclude_globs: Vec<String>,

    /// Treat warnings as failures.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Output format (text, table, or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating validation to a daemon.
    #[arg(long = "server", env = "DOXSEARCH_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force local validation.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `show` subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// A `<section>_<n>.js` file or a `searchdata.js` section table.
    pub file: PathBuf,

    /// Output format.
    #[arg(long = "format", value_enum, default_value_t = ShowFormat::Text)]
    pub format: ShowFormat,
}

/// Output format of `show`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowFormat {
    Text,
    Json,
    /// Rewrite the file the way Doxygen lays it out.
    Js,
}

/// CLI representation of output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Table,
    Json,
}

/// CLI representation of index backend kind.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackendArg {
    File,
    Sqlite,
}

/// Arguments specific to the `index` subcommand.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Search directories or files to index (defaults to current directory).
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Inclusion globs applied to candidate files.
    #[arg(long = "glob")]
    pub globs: Vec<String>,

    /// Exclusion globs applied to candidate files.
    #[arg(long = "exclude")]
    pub exclude_globs: Vec<String>,

    /// Index backend to use.
    ///
    /// When omitted, the backend is inferred from `--index-path`
    /// (`*.sqlite` selects SQLite) and otherwise defaults to file.
    #[arg(long = "index-backend", value_enum)]
    pub backend: Option<IndexBackendArg>,

    /// Location for on-disk index data.
    ///
    /// For the file backend this should be a directory (e.g. ".doxsearch").
    /// For the SQLite backend this is typically a database file path
    /// such as ".doxsearch/index.sqlite".
    #[arg(long = "index-path")]
    pub index_path: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating indexing to a daemon.
    #[arg(long = "server", env = "DOXSEARCH_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force local indexing.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `index-info` subcommand.
#[derive(Args, Debug)]
pub struct IndexInfoArgs {
    /// Paths the index was built from (defaults to current directory).
    #[arg(short = 'p', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Index backend to use.
    #[arg(long = "index-backend", value_enum)]
    pub backend: Option<IndexBackendArg>,

    /// Location for on-disk index data.
    #[arg(long = "index-path")]
    pub index_path: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating index introspection to a daemon.
    #[arg(long = "server", env = "DOXSEARCH_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force local index introspection.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Symbol table (`.json` or `.toml`).
    pub input: PathBuf,

    /// Output directory (defaults to `search`).
    #[arg(short = 'o', long = "output")]
    pub output_dir: Option<PathBuf>,

    /// First numeric key id to assign.
    #[arg(long = "start-id")]
    pub start_id: Option<u64>,

    /// Output format for the summary (text or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments specific to the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to, e.g. "127.0.0.1:7878".
    #[arg(long = "addr", default_value = DEFAULT_SERVE_ADDR)]
    pub addr: String,
}

fn paths_or_cwd(paths: &[PathBuf]) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        paths.to_vec()
    }
}

/// Pick the backend and location of an index from optional CLI values.
///
/// An explicit backend wins; otherwise a `*.sqlite` path selects
/// SQLite and anything else the file backend.
fn resolve_index_location(
    backend: Option<IndexBackendArg>,
    index_path: Option<&PathBuf>,
) -> (IndexBackendKind, PathBuf) {
    let backend_arg = match (backend, index_path) {
        (Some(kind), _) => kind,
        (None, Some(path)) => {
            if path
                .extension()
                .and_then(|e| e.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("sqlite"))
                .unwrap_or(false)
            {
                IndexBackendArg::Sqlite
            } else {
                IndexBackendArg::File
            }
        }
        (None, None) => IndexBackendArg::File,
    };

    let kind = match backend_arg {
        IndexBackendArg::File => IndexBackendKind::File,
        IndexBackendArg::Sqlite => IndexBackendKind::Sqlite,
    };

    let path = match (index_path, backend_arg) {
        (Some(path), _) => path.clone(),
        (None, IndexBackendArg::File) => PathBuf::from(DEFAULT_INDEX_DIR),
        (None, IndexBackendArg::Sqlite) => PathBuf::from(DEFAULT_INDEX_DIR).join(DEFAULT_SQLITE_FILE),
    };

    (kind, path)
}

/// Build a core `SearchConfig` from CLI `SearchArgs`.
pub fn search_config_from_args(args: &SearchArgs) -> Result<SearchConfig> {
    let paths = paths_or_cwd(&args.paths);

    let index = if args.use_index {
        let (backend, index_path) =
            resolve_index_location(args.index_backend, args.index_path.as_ref());
        Some(IndexConfig {
            paths: paths.clone(),
            globs: args.globs.clone(),
            exclude_globs: args.exclude_globs.clone(),
            backend,
            index_path,
        })
    } else {
        None
    };

    Ok(SearchConfig {
        pattern: args.pattern.clone(),
        paths,
        globs: args.globs.clone(),
        exclude_globs: args.exclude_globs.clone(),
        sections: args.sections.clone(),
        literal: args.literal,
        limit: args.limit,
        reindex_on_search: args.reindex_on_search,
        index,
        query_expr: None,
    })
}

/// Build a core `ValidateConfig` from CLI `ValidateArgs`.
pub fn validate_config_from_args(args: &ValidateArgs) -> ValidateConfig {
    ValidateConfig {
        paths: paths_or_cwd(&args.paths),
        globs: args.globs.clone(),
        exclude_globs: args.exclude_globs.clone(),
        strict: args.strict,
    }
}

/// Build a core `IndexConfig` from CLI `IndexArgs`.
pub fn index_config_from_args(args: &IndexArgs) -> Result<IndexConfig> {
    let (backend, index_path) = resolve_index_location(args.backend, args.index_path.as_ref());

    Ok(IndexConfig {
        paths: paths_or_cwd(&args.paths),
        globs: args.globs.clone(),
        exclude_globs: args.exclude_globs.clone(),
        backend,
        index_path,
    })
}

/// Build a core `IndexConfig` from CLI `IndexInfoArgs`.
pub fn index_info_config_from_args(args: &IndexInfoArgs) -> Result<IndexConfig> {
    let (backend, index_path) = resolve_index_location(args.backend, args.index_path.as_ref());

    Ok(IndexConfig {
        paths: paths_or_cwd(&args.paths),
        globs: Vec::new(),
        exclude_globs: Vec::new(),
        backend,
        index_path,
    })
}

/// Build a core `GenerateConfig` from CLI `GenerateArgs`.
pub fn generate_config_from_args(args: &GenerateArgs) -> GenerateConfig {
    GenerateConfig {
        input: args.input.clone(),
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GENERATE_DIR)),
        start_id: args.start_id.unwrap_or(0),
    }
}

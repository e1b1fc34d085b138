use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::args::{IndexBackendArg, OutputFormat, DEFAULT_SERVE_ADDR};
use crate::cli::{
    GenerateArgs, IndexArgs, IndexInfoArgs, SearchArgs, ServeArgs, ValidateArgs,
};
use crate::models::Section;

/// Top-level representation of `.doxsearch/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub search: Option<SearchSection>,

    #[serde(default)]
    pub index: Option<IndexSection>,

    #[serde(default, rename = "index_info")]
    pub index_info: Option<IndexInfoSection>,

    #[serde(default)]
    pub validate: Option<ValidateSection>,

    #[serde(default)]
    pub generate: Option<GenerateSection>,

    #[serde(default)]
    pub serve: Option<ServeSection>,

    #[serde(default)]
    pub http: Option<HttpSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default, alias = "exclude")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub literal: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub use_index: Option<bool>,
    #[serde(default)]
    pub index_backend: Option<IndexBackendArg>,
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default, alias = "exclude")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub backend: Option<IndexBackendArg>,
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexInfoSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub backend: Option<IndexBackendArg>,
    #[serde(default)]
    pub index_path: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateSection {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub globs: Vec<String>,
    #[serde(default, alias = "exclude")]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateSection {
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub start_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServeSection {
    #[serde(default)]
    pub addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpSection {
    #[serde(default)]
    pub server_url: Option<String>,
}

/// Discover and load a project-local `.doxsearch/config.toml` (or
/// `.doxsearch/doxsearch.toml`) starting from the current working
/// directory and walking up parent directories.
pub fn load_cli_config() -> Result<Option<CliConfig>> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config_path = find_project_config(&cwd);

    let Some(path) = config_path else {
        return Ok(None);
    };

    tracing::debug!("using config {}", path.display());

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse TOML config at {}", path.display()))?;

    Ok(Some(config))
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);

    while let Some(current) = dir {
        let doxsearch_dir = current.join(".doxsearch");
        let config_toml = doxsearch_dir.join("config.toml");
        if config_toml.is_file() {
            return Some(config_toml);
        }

        let doxsearch_toml = doxsearch_dir.join("doxsearch.toml");
        if doxsearch_toml.is_file() {
            return Some(doxsearch_toml);
        }

        dir = current.parent();
    }

    None
}

/// Server URL for a command: the section's own `server`, else the
/// global `[http] server_url`.
fn section_server(config: &CliConfig, server: Option<&String>) -> Option<String> {
    server
        .cloned()
        .or_else(|| config.http.as_ref().and_then(|h| h.server_url.clone()))
}

pub fn apply_search_config_defaults(config: &CliConfig, args: &mut SearchArgs) {
    let Some(search) = &config.search else {
        if args.server.is_none() {
            args.server = section_server(config, None);
        }
        return;
    };

    if args.paths.is_empty() && !search.paths.is_empty() {
        args.paths = search.paths.clone();
    }

    if args.globs.is_empty() && !search.globs.is_empty() {
        args.globs = search.globs.clone();
    }

    if args.exclude_globs.is_empty() && !search.exclude_globs.is_empty() {
        args.exclude_globs = search.exclude_globs.clone();
    }

    if args.sections.is_empty() && !search.sections.is_empty() {
        args.sections = search.sections.clone();
    }

    if !args.literal {
        if let Some(true) = search.literal {
            args.literal = true;
        }
    }

    if args.limit.is_none() {
        args.limit = search.limit;
    }

    if !args.use_index {
        if let Some(true) = search.use_index {
            args.use_index = true;
        }
    }

    if args.index_backend.is_none() {
        args.index_backend = search.index_backend;
    }

    if args.index_path.is_none() {
        args.index_path = search.index_path.clone();
    }

    if matches!(args.format, OutputFormat::Text) {
        if let Some(format) = search.format {
            args.format = format;
        }
    }

    if args.server.is_none() {
        args.server = section_server(config, search.server.as_ref());
    }

    if !args.no_server {
        if let Some(true) = search.no_server {
            args.no_server = true;
        }
    }
}

pub fn apply_validate_config_defaults(config: &CliConfig, args: &mut ValidateArgs) {
    let Some(validate) = &config.validate else {
        if args.server.is_none() {
            args.server = section_server(config, None);
        }
        return;
    };

    if args.paths.is_empty() && !validate.paths.is_empty() {
        args.paths = validate.paths.clone();
    }

    if args.globs.is_empty() && !validate.globs.is_empty() {
        args.globs = validate.globs.clone();
    }

    if args.exclude_globs.is_empty() && !validate.exclude_globs.is_empty() {
        args.exclude_globs = validate.exclude_globs.clone();
    }

    if !args.strict {
        if let Some(true) = validate.strict {
            args.strict = true;
        }
    }

    if matches!(args.format, OutputFormat::Text) {
        if let Some(format) = validate.format {
            args.format = format;
        }
    }

    if args.server.is_none() {
        args.server = section_server(config, validate.server.as_ref());
    }

    if !args.no_server {
        if let Some(true) = validate.no_server {
            args.no_server = true;
        }
    }
}

pub fn apply_index_config_defaults(config: &CliConfig, args: &mut IndexArgs) {
    let Some(index) = &config.index else {
        if args.server.is_none() {
            args.server = section_server(config, None);
        }
        return;
    };

    if args.paths.is_empty() && !index.paths.is_empty() {
        args.paths = index.paths.clone();
    }

    if args.globs.is_empty() && !index.globs.is_empty() {
        args.globs = index.globs.clone();
    }

    if args.exclude_globs.is_empty() && !index.exclude_globs.is_empty() {
        args.exclude_globs = index.exclude_globs.clone();
    }

    if args.backend.is_none() {
        args.backend = index.backend;
    }

    if args.index_path.is_none() {
        args.index_path = index.index_path.clone();
    }

    if args.server.is_none() {
        args.server = section_server(config, index.server.as_ref());
    }

    if !args.no_server {
        if let Some(true) = index.no_server {
            args.no_server = true;
        }
    }
}

pub fn apply_index_info_config_defaults(config: &CliConfig, args: &mut IndexInfoArgs) {
    let Some(info) = &config.index_info else {
        if args.server.is_none() {
            args.server = section_server(config, None);
        }
        return;
    };

    if args.paths.is_empty() && !info.paths.is_empty() {
        args.paths = info.paths.clone();
    }

    if args.backend.is_none() {
        args.backend = info.backend;
    }

    if args.index_path.is_none() {
        args.index_path = info.index_path.clone();
    }

    if matches!(args.format, OutputFormat::Text) {
        if let Some(format) = info.format {
            args.format = format;
        }
    }

    if args.server.is_none() {
        args.server = section_server(config, info.server.as_ref());
    }

    if !args.no_server {
        if let Some(true) = info.no_server {
            args.no_server = true;
        }
    }
}

pub fn apply_generate_config_defaults(config: &CliConfig, args: &mut GenerateArgs) {
    if let Some(generate) = &config.generate {
        if args.output_dir.is_none() {
            args.output_dir = generate.output_dir.clone();
        }

        if args.start_id.is_none() {
            args.start_id = generate.start_id;
        }
    }
}

pub fn apply_serve_config_defaults(config: &CliConfig, args: &mut ServeArgs) {
    if let Some(serve) = &config.serve {
        if args.addr == DEFAULT_SERVE_ADDR {
            if let Some(addr) = &serve.addr {
                args.addr = addr.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_config_in_parent_directories() {
        let tmp = tempdir().expect("tempdir");
        let dox = tmp.path().join(".doxsearch");
        fs::create_dir_all(&dox).expect("mkdir");
        fs::write(dox.join("doxsearch.toml"), "").expect("write");

        let nested = tmp.path().join("html").join("search");
        fs::create_dir_all(&nested).expect("mkdir");

        assert_eq!(find_project_config(&nested), Some(dox.join("doxsearch.toml")));

        fs::write(dox.join("config.toml"), "").expect("write");
        assert_eq!(find_project_config(&nested), Some(dox.join("config.toml")));
    }

    #[test]
    fn http_server_url_applies_without_command_section() {
        let config: CliConfig = toml::from_str(
            "[http]\nserver_url = \"http://127.0.0.1:7878\"\n\n[validate]\nstrict = true\n",
        )
        .expect("config");

        let mut args = ValidateArgs {
            paths: Vec::new(),
            globs: Vec::new(),
            exclude_globs: Vec::new(),
            strict: false,
            format: OutputFormat::Text,
            server: None,
            no_server: false,
        };
        apply_validate_config_defaults(&config, &mut args);
        assert!(args.strict);
        assert_eq!(args.server.as_deref(), Some("http://127.0.0.1:7878"));

        let mut serve = ServeArgs {
            addr: DEFAULT_SERVE_ADDR.to_string(),
        };
        apply_serve_config_defaults(&config, &mut serve);
        assert_eq!(serve.addr, DEFAULT_SERVE_ADDR);
    }

    #[test]
    fn search_sections_parse_from_config() {
        let config: CliConfig =
            toml::from_str("[search]\nsections = [\"functions\", \"variables\"]\nlimit = 5\n")
                .expect("config");
        let search = config.search.expect("search section");
        assert_eq!(search.sections, vec![Section::Functions, Section::Variables]);
        assert_eq!(search.limit, Some(5));
    }
}

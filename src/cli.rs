//! Minimal CLI: catalog + configuration → (plan | rust)
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::catalog::Catalog;
use crate::codegen::{self, Emitter, RustEmitter};
use crate::config::GenerationConfig;
use crate::driver::{Generation, Generator, Severity};
use crate::error::Error;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate serialization surrogates from a type catalog and a generation config,
/// and output either the JSON generation plan or Rust source
#[derive(Parser, Debug)]
#[command(name = "surrogate-gen", version)]
pub struct CommandLineInterface {
    /// more logging (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// generate and print the plan (units, modules, diagnostics) as JSON
    Plan(PlanOut),
    /// generate and emit Rust source, one file per surrogate and per module
    Rust(RustOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// Type catalog files. May be literal paths or quoted glob patterns
    #[arg(long, num_args = 1.., required = true)]
    catalog: Vec<String>,

    /// Generation config files. May be literal paths or quoted glob patterns
    #[arg(long, num_args = 1.., required = true)]
    config: Vec<String>,

    /// override `options.surrogate_suffix`
    #[arg(long)]
    surrogate_suffix: Option<String>,

    /// override `options.serializer_suffix`
    #[arg(long)]
    serializer_suffix: Option<String>,

    /// override `options.module_suffix`
    #[arg(long)]
    module_suffix: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct PlanOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct RustOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output directory (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> anyhow::Result<(Catalog, GenerationConfig)> {
        let mut catalog = Catalog::new();
        for path in resolve_file_path_patterns(&self.catalog)? {
            catalog.merge(Catalog::from_file(&path)?);
        }

        let mut config = GenerationConfig::default();
        for (index, path) in resolve_file_path_patterns(&self.config)?.into_iter().enumerate() {
            let loaded = GenerationConfig::from_file(&path)?;
            if index == 0 {
                config.options = loaded.options.clone();
            }
            config.extend(loaded);
        }
        if let Some(suffix) = &self.surrogate_suffix {
            config.options.surrogate_suffix = suffix.clone();
        }
        if let Some(suffix) = &self.serializer_suffix {
            config.options.serializer_suffix = suffix.clone();
        }
        if let Some(suffix) = &self.module_suffix {
            config.options.module_suffix = suffix.clone();
        }
        config.validate()?;

        info!(types = catalog.len(), entries = config.entries.len(), "loaded inputs");
        Ok((catalog, config))
    }

    /// Everything that could be generated; deferred entries are reported,
    /// the caller decides when they fail the run.
    fn generate(&self) -> anyhow::Result<Generation> {
        let (catalog, config) = self.load()?;
        let generation = Generator::new(config.options.clone()).run(&catalog, &config.entries);
        report(&generation);
        Ok(generation)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        self.init_tracing();
        match &self.cmd {
            Command::Plan(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let generation = target.input_settings.generate()?;
                let plan_src = serde_json::to_string_pretty(&generation)?;
                match target.out.as_ref() {
                    Some(out) => write_file(out, &plan_src)?,
                    None => println!("{plan_src}"),
                }
                generation.ensure_resolved().context("generation incomplete")?;
            }
            Command::Rust(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let generation = target.input_settings.generate()?;
                let files = RustEmitter.emit_all(&generation);
                match target.out.as_ref() {
                    Some(out) => {
                        codegen::write_all(&files, out)?;
                        info!(files = files.len(), out = %out.display(), "emitted");
                    }
                    None => {
                        for file in &files {
                            println!("// file: {}", file.path.display());
                            println!("{}", file.contents);
                        }
                    }
                }
                generation.ensure_resolved().context("generation incomplete")?;
            }
        }
        Ok(())
    }

    fn init_tracing(&self) {
        let level = match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "debug",
            (false, _) => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report(generation: &Generation) {
    for diagnostic in &generation.diagnostics {
        let label = match diagnostic.severity {
            Severity::Warning => "warning".yellow().bold(),
            Severity::Error => "error".red().bold(),
        };
        eprintln!("{label}: {diagnostic}");
    }
    for deferred in &generation.deferred {
        eprintln!("{}: {deferred}", "deferred".cyan().bold());
    }
}

fn write_file(out: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(out, contents).with_context(|| format!("writing {}", out.display()))?;
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Error>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let no_input = || Error::NoInput { pattern: pattern.to_string() };
            let entries = glob::glob(pattern).map_err(|_| no_input())?;
            let before = out.len();
            for entry in entries {
                match entry {
                    Ok(path) => out.push(path),
                    Err(error) => {
                        let path = error.path().to_path_buf();
                        return Err(Error::Io { path, source: error.into() });
                    }
                }
            }
            if out.len() == before {
                return Err(no_input());
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

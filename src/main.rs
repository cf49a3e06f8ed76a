use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info};
use std::path::{Path, PathBuf};

use ultra_conf::{
    BuildConfiguration, ConfigLoader, Declaration, LoaderOptions, ThemeCatalog, UnknownKeyPolicy,
};

#[derive(Parser)]
#[command(name = "ultra-conf")]
#[command(about = "Validate documentation build declarations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a declaration
    Check {
        /// Declaration file (.toml, .yaml, .yml, .json or conf.py)
        file: PathBuf,

        #[command(flatten)]
        loader: LoaderArgs,
    },
    /// Print the resolved build configuration
    Show {
        /// Declaration file (.toml, .yaml, .yml, .json or conf.py)
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[command(flatten)]
        loader: LoaderArgs,
    },
}

#[derive(Args)]
struct LoaderArgs {
    /// Warn about unknown top-level keys instead of failing
    #[arg(long)]
    warn_unknown: bool,

    /// Fail if the theme is not bundled or found in a theme path
    #[arg(long)]
    strict_theme: bool,

    /// Directories searched for themes by --strict-theme
    #[arg(long = "theme-path")]
    theme_paths: Vec<PathBuf>,

    /// Additional installed theme names accepted by --strict-theme
    #[arg(long = "theme")]
    themes: Vec<String>,

    /// Theme used when the declaration names none
    #[arg(long)]
    default_theme: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
    Toml,
}

impl LoaderArgs {
    fn options(&self) -> LoaderOptions {
        let mut options = LoaderOptions::default();

        if self.warn_unknown {
            options = options.with_unknown_keys(UnknownKeyPolicy::Warn);
        }

        if let Some(theme) = &self.default_theme {
            options = options.with_default_theme(theme.clone());
        }

        if self.strict_theme {
            let mut catalog = ThemeCatalog::builtin();
            for path in &self.theme_paths {
                catalog.add_search_path(path.clone());
            }
            let discovered = catalog.discover();
            debug!("Discovered {} theme(s) in theme paths", discovered);
            for theme in &self.themes {
                catalog.register(theme.clone());
            }
            options = options.with_theme_catalog(catalog);
        }

        options
    }
}

fn load(file: &Path, args: &LoaderArgs) -> Result<BuildConfiguration> {
    let declaration = Declaration::read(file)
        .with_context(|| format!("Failed to read declaration {}", file.display()))?;

    let loader = ConfigLoader::new(args.options());
    let config = loader
        .load(&declaration)
        .with_context(|| format!("Invalid declaration {}", file.display()))?;

    Ok(config)
}

fn render(config: &BuildConfiguration, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
        OutputFormat::Yaml => serde_yaml::to_string(config)?,
        OutputFormat::Toml => toml::to_string_pretty(config)?,
    };
    Ok(rendered)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Check { file, loader } => {
            let config = load(&file, &loader)?;
            info!("{} is valid", file.display());
            println!("{}", config);
        }
        Commands::Show {
            file,
            format,
            loader,
        } => {
            let config = load(&file, &loader)?;
            print!("{}", render(&config, format)?);
        }
    }

    Ok(())
}

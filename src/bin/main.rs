use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use expect_platform::consts::CLASS_FILE_SUFFIX;
use expect_platform::transform::inject::{list_support_classes, new_class_name};
use expect_platform::{BuildIdentifier, Config, Diagnostics, DirectoryOutput, OutputInterface, Transformer};

#[derive(Parser)]
#[command(name = "expect-platform")]
#[command(about = "Rewrites @ExpectPlatform methods in compiled classes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite every .class file under a directory
    Transform {
        /// Directory of compiled classes
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory for rewritten and injected classes
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Build identifier to use instead of a generated one
        #[arg(long, value_name = "ID")]
        identifier: Option<String>,

        /// Project name embedded in a generated identifier
        #[arg(long, value_name = "NAME")]
        project: Option<String>,

        /// Do not inject the support classes
        #[arg(long)]
        no_inject: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the embedded support classes
    Support {
        /// Show the names they would get under this identifier
        #[arg(long, value_name = "ID")]
        identifier: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Transform { verbose: true, .. });
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "info" }))
        .init();

    match &cli.command {
        Commands::Transform { input, output, identifier, project, no_inject, .. } => {
            let mut config = Config::from_env()?;
            if let Some(identifier) = identifier {
                config = config.with_identifier(identifier);
            }
            if let Some(project) = project {
                config = config.with_project_name(project);
            }
            if *no_inject {
                config = config.inject_injectables(false);
            }
            transform_dir(input, output, &config)?;
        }
        Commands::Support { identifier } => {
            list_support(identifier.as_deref())?;
        }
    }

    Ok(())
}

fn transform_dir(input: &Path, output: &Path, config: &Config) -> Result<()> {
    let context = config.build_context()?;
    let identifier = BuildIdentifier::init_global(context.identifier.clone());
    log::info!("build identifier: {}", identifier);

    let transformer = Transformer::new(context);
    let mut sink = DirectoryOutput::new(output);
    let mut diagnostics = Diagnostics::new();
    let mut count = 0usize;

    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", input.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = class_name(input, path) else {
            continue;
        };
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let rewritten = transformer
            .transform_class(&name, &bytes, &mut diagnostics)
            .with_context(|| format!("failed to transform {}", name))?;
        sink.add_class(&name, rewritten).with_context(|| format!("failed to write {}", name))?;
        count += 1;
    }

    let injected = transformer.edit_assets(&mut sink)?;
    log::info!(
        "processed {} classes, injected {} support classes, {} diagnostics",
        count,
        injected.len(),
        diagnostics.len()
    );
    Ok(())
}

/// Internal name of a `.class` file relative to the input root
fn class_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let text = relative.to_str()?.replace('\\', "/");
    text.strip_suffix(CLASS_FILE_SUFFIX).map(str::to_string)
}

fn list_support(identifier: Option<&str>) -> Result<()> {
    let identifier = identifier.map(BuildIdentifier::new).transpose()?;
    for entry in list_support_classes()? {
        match &identifier {
            Some(id) => {
                let renamed = new_class_name(&entry, id).unwrap_or_default();
                println!("{} -> {}", entry, renamed);
            }
            None => println!("{}", entry),
        }
    }
    Ok(())
}

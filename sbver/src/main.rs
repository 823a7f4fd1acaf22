mod output;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use output::{
    BackupOutput, FileHash, HashOutput, InitOutput, OutputWriter, ScanOutput, VersionOutput,
    relative,
};
use sbver_core::{Component, Hash, Project, ScanOptions, Template, Vcs};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// sbver - change detection and per-file version stamping
#[derive(Parser)]
#[command(name = "sbver")]
#[command(about = "Track file changes and stamp version headers into sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true, env = "SBVER_ROOT", default_value = ".")]
    root: PathBuf,

    /// Log debug details to stderr
    #[arg(short, long, global = true, conflicts_with = "silent")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    silent: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a project
    Init {
        /// Project directory (defaults to --root)
        path: Option<PathBuf>,

        /// Preset for tracked extensions and ignore rules (default, rust, dotnet, node)
        #[arg(short, long, default_value = "default")]
        template: String,

        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,

        /// Exclude the metadata directory of a version control system (git, svn, hg)
        #[arg(short = 'c', long)]
        vcs: Option<String>,
    },

    /// Scan the project, stamp changed sources, and record a new snapshot
    Scan {
        /// Project directory (defaults to --root)
        path: Option<PathBuf>,

        /// Only scan files directly in the project root; nothing is persisted
        #[arg(long)]
        shallow: bool,

        /// Show the hash of every scanned file
        #[arg(long)]
        hash: bool,

        /// Show scanned files as a directory tree
        #[arg(long)]
        tree: bool,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Hash and diff only; no headers, snapshot, or backup are written
        #[arg(long)]
        dry_run: bool,
    },

    /// Show or change the application version
    #[command(subcommand)]
    Version(VersionCommands),

    /// Print the MD5 digest of files
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the entries recorded as changed by the last scan
    Backup,
}

#[derive(Subcommand)]
enum VersionCommands {
    /// Print the application version
    Show,

    /// Increment one component (revision by default)
    #[command(group(ArgGroup::new("component").args(["major", "minor", "build", "revision"])))]
    Bump {
        #[arg(long)]
        major: bool,
        #[arg(long)]
        minor: bool,
        #[arg(long)]
        build: bool,
        #[arg(long)]
        revision: bool,
    },

    /// Set the application version
    Set {
        /// Version as Major.Minor.Build.Revision
        version: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.silent);

    let json = cli.json
        || matches!(
            cli.command,
            Commands::Scan {
                format: Some(Format::Json),
                ..
            }
        );
    let output = OutputWriter::new(json);

    match run(cli, &output) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let code = result_code(&err);
            output.write_error(&err, code);
            ExitCode::from(code)
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over the
/// verbosity flags.
fn init_logging(verbose: bool, silent: bool) {
    let default = if verbose {
        "sbver=debug,sbver_core=debug"
    } else if silent {
        "error"
    } else {
        "sbver=info,sbver_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Exit code of the first core error in the chain, 1 for anything else.
fn result_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<sbver_core::Error>())
        .map(sbver_core::Error::exit_code)
        .unwrap_or(1)
}

fn run(cli: Cli, output: &OutputWriter) -> Result<u8> {
    let root = cli.root;

    match cli.command {
        Commands::Init {
            path,
            template,
            force,
            vcs,
        } => cmd_init(output, path.as_deref().unwrap_or(&root), &template, force, vcs),
        Commands::Scan {
            path,
            shallow,
            hash,
            tree,
            format: _,
            dry_run,
        } => {
            let options = ScanOptions {
                recursive: !shallow,
                dry_run,
            };
            cmd_scan(output, path.as_deref().unwrap_or(&root), options, hash, tree)
        }
        Commands::Version(version_cmd) => match version_cmd {
            VersionCommands::Show => cmd_version_show(output, &root),
            VersionCommands::Bump {
                major,
                minor,
                build,
                revision: _,
            } => {
                let component = if major {
                    Component::Major
                } else if minor {
                    Component::Minor
                } else if build {
                    Component::Build
                } else {
                    Component::Revision
                };
                cmd_version_bump(output, &root, component)
            }
            VersionCommands::Set { version } => cmd_version_set(output, &root, &version),
        },
        Commands::Hash { files } => cmd_hash(output, &files),
        Commands::Backup => cmd_backup(output, &root),
    }
}

fn open_project(root: &Path) -> Result<Project> {
    Project::open(root).with_context(|| format!("Failed to open project at {}", root.display()))
}

fn cmd_init(
    output: &OutputWriter,
    root: &Path,
    template: &str,
    force: bool,
    vcs: Option<String>,
) -> Result<u8> {
    let template = Template::parse(template)?;
    let vcs = vcs.as_deref().map(Vcs::parse).transpose()?;

    let project = Project::init(root, template, force, vcs)
        .with_context(|| format!("Failed to initialize project at {}", root.display()))?;

    let data = InitOutput {
        success: true,
        result_code: 0,
        root: project.root().display().to_string(),
        template: template.as_str().to_string(),
        vcs: vcs.map(|v| v.as_str().to_string()),
        extensions: project.config().extensions.clone(),
    };

    output.write(&data, || {
        let mut text = format!(
            "Initialized sbver project at {}\nTemplate: {}\nTracked extensions: {}\n",
            data.root,
            data.template,
            data.extensions.join(", ")
        );
        if let Some(vcs) = &data.vcs {
            text.push_str(&format!("Ignoring {} metadata\n", vcs));
        }
        text
    })?;

    Ok(0)
}

fn cmd_scan(
    output: &OutputWriter,
    root: &Path,
    options: ScanOptions,
    show_hashes: bool,
    show_tree: bool,
) -> Result<u8> {
    let project = open_project(root)?;

    if output.is_json() && (show_hashes || show_tree) {
        debug!("--hash and --tree only affect text output");
    }

    let report = project
        .sync(options)
        .with_context(|| format!("Failed to scan {}", project.root().display()))?;

    let data = ScanOutput::new(&report, project.root(), options.dry_run, options.recursive);
    output.write(&data, || data.to_text(show_hashes, show_tree))?;

    Ok(data.result_code)
}

fn cmd_version_show(output: &OutputWriter, root: &Path) -> Result<u8> {
    let project = open_project(root)?;
    let version = project
        .app_version()
        .context("Failed to read application version")?;

    let data = VersionOutput {
        success: true,
        result_code: 0,
        previous: None,
        version,
    };
    output.write(&data, || format!("{}\n", data.version))?;

    Ok(0)
}

fn cmd_version_bump(output: &OutputWriter, root: &Path, component: Component) -> Result<u8> {
    let project = open_project(root)?;
    let previous = project
        .app_version()
        .context("Failed to read application version")?;
    let version = project
        .bump_app_version(component)
        .context("Failed to bump application version")?;

    let data = VersionOutput {
        success: true,
        result_code: 0,
        previous: Some(previous),
        version,
    };
    output.write(&data, || format!("{} -> {}\n", previous, data.version))?;

    Ok(0)
}

fn cmd_version_set(output: &OutputWriter, root: &Path, value: &str) -> Result<u8> {
    let project = open_project(root)?;
    let previous = project
        .app_version()
        .context("Failed to read application version")?;
    let version = project
        .set_app_version(value)
        .with_context(|| format!("Failed to set application version to '{}'", value))?;

    let data = VersionOutput {
        success: true,
        result_code: 0,
        previous: Some(previous),
        version,
    };
    output.write(&data, || format!("{} -> {}\n", previous, data.version))?;

    Ok(0)
}

fn cmd_hash(output: &OutputWriter, files: &[PathBuf]) -> Result<u8> {
    let mut hashes = Vec::with_capacity(files.len());
    for path in files {
        let hash =
            Hash::hash_file(path).with_context(|| format!("Failed to hash {}", path.display()))?;
        hashes.push(FileHash {
            path: path.display().to_string(),
            hash,
        });
    }

    let data = HashOutput {
        success: true,
        result_code: 0,
        files: hashes,
    };
    output.write(&data, || {
        data.files
            .iter()
            .map(|f| format!("{}  {}\n", f.hash, f.path))
            .collect()
    })?;

    Ok(0)
}

fn cmd_backup(output: &OutputWriter, root: &Path) -> Result<u8> {
    let project = open_project(root)?;
    let records = project.backup().context("Failed to read backup")?;

    let data = BackupOutput {
        success: true,
        result_code: 0,
        path: relative(&project.backup_path(), project.root()),
        records,
    };
    output.write(&data, || {
        if data.records.is_empty() {
            return "No changed entries recorded\n".to_string();
        }
        data.records
            .iter()
            .map(|r| format!("{}  {}\n", r.hash, r.name))
            .collect()
    })?;

    Ok(0)
}

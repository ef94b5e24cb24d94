use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::cli::{
    Cli, Command, ConfigCommand, CreateArgs, ExportArgs, PreviewArgs, SourceArgs, TemplateCommand,
};
use crate::config::{self, ForgeConfig};
use crate::structure::{self, StructureNode};
use crate::templates::TemplateLibrary;
use crate::{exchange, materialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ConfigPathSource {
    Explicit,
    Discovered,
    HomeDefault,
}

impl ConfigPathSource {
    fn as_str(&self) -> &'static str {
        match self {
            ConfigPathSource::Explicit => "explicit",
            ConfigPathSource::Discovered => "discovered",
            ConfigPathSource::HomeDefault => "home-default",
        }
    }
}

#[derive(Clone, Debug)]
struct ResolvedConfigPath {
    path: Utf8PathBuf,
    source: ConfigPathSource,
}

pub fn run(cli: Cli) -> Result<()> {
    let cli = normalize_external(cli)?;
    let ctx = CliContext::from(&cli);
    ctx.apply_chdir()?;

    match cli.command {
        Command::Config { command } => handle_config_only(&ctx, command),
        other => {
            let state = AppState::new(ctx)?;
            handle_with_state(&state, other)
        }
    }
}

fn handle_with_state(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Create(args) => handle_create(state, args),
        Command::Preview(args) => handle_preview(state, args),
        Command::Template { command } => handle_template(state, command),
        Command::Export(args) => handle_export(state, args),
        Command::Config { .. } => unreachable!("config commands handled earlier"),
        Command::External(extra) => {
            bail!("unknown command: {}", extra.join(" "))
        }
    }
}

/// Rewrite `folderforge <base_dir> <structure_file>` into the `create` form.
fn normalize_external(cli: Cli) -> Result<Cli> {
    let Command::External(extra) = &cli.command else {
        return Ok(cli);
    };

    if extra.is_empty() {
        return Ok(cli);
    }

    let mut argv: Vec<String> = Vec::new();
    argv.push("folderforge".to_owned());

    if let Some(chdir) = &cli.chdir {
        argv.push("--chdir".to_owned());
        argv.push(chdir.to_string_lossy().to_string());
    }

    if let Some(config) = &cli.config {
        argv.push("--config".to_owned());
        argv.push(config.to_string_lossy().to_string());
    }

    if cli.dry_run {
        argv.push("--dry-run".to_owned());
    }

    for _ in 0..cli.verbose {
        argv.push("--verbose".to_owned());
    }

    argv.push("create".to_owned());
    argv.extend(extra.iter().cloned());

    crate::cli::try_parse_args(argv).map_err(|err| anyhow!(err.to_string()))
}

fn handle_create(state: &AppState, args: CreateArgs) -> Result<()> {
    let base = utf8_path(args.base_dir, "base directory")?;
    let source = state.read_source(&args.source)?;
    let node = state.parse_source(&source, args.strict)?;

    if node.is_empty() {
        println!("Nothing to create: {} describes no folders.", source.label);
        return Ok(());
    }

    if state.ctx.dry_run {
        let planned = materialize::plan(&base, &node)
            .with_context(|| format!("planning folders from {} in {}", source.label, base))?;
        for path in &planned {
            println!("[dry-run] would create {}", path);
        }
        println!("[dry-run] {} folder(s) planned in {}", planned.len(), base);
        return Ok(());
    }

    println!("Starting folder creation in: {}", base);
    let mut addressed = 0usize;
    materialize::materialize(&base, &node, |path| {
        println!("Created folder: {}", path);
        addressed += 1;
    })
    .with_context(|| format!("creating folders from {} in {}", source.label, base))?;
    println!("Folders created successfully ({} addressed).", addressed);
    Ok(())
}

fn handle_preview(state: &AppState, args: PreviewArgs) -> Result<()> {
    print!("{}", preview_report(state, &args)?);
    Ok(())
}

fn preview_report(state: &AppState, args: &PreviewArgs) -> Result<String> {
    let source = state.read_source(&args.source)?;
    let node = state.parse_source(&source, args.strict)?;
    let root = Utf8Path::new("");
    let planned = materialize::plan(root, &node)
        .with_context(|| format!("checking structure in {}", source.label))?;

    if planned.is_empty() {
        return Ok(format!("{} describes no folders.\n", source.label));
    }

    Ok(format!(
        "Folders described by {}:\n{}",
        source.label,
        materialize::format_outline(root, &planned)
    ))
}

fn handle_template(state: &AppState, command: TemplateCommand) -> Result<()> {
    let library = state.templates()?;
    print!("{}", template_report(&library, command)?);
    Ok(())
}

fn template_report(library: &TemplateLibrary, command: TemplateCommand) -> Result<String> {
    match command {
        TemplateCommand::List => {
            let mut out = String::from("Available templates:\n");
            for entry in library.entries() {
                let _ = writeln!(out, "  - {:24} ({})", entry.name, entry.source.as_str());
            }
            Ok(out)
        }
        TemplateCommand::Show { name } => {
            let mut text = library.read(&name)?;
            if !text.ends_with('\n') {
                text.push('\n');
            }
            Ok(text)
        }
    }
}

fn handle_export(state: &AppState, args: ExportArgs) -> Result<()> {
    let dest = utf8_path(args.dest, "export destination")?;
    let source = state.read_source(&SourceArgs {
        structure_file: args.from,
        template: args.template,
    })?;

    let text = if args.canonical {
        let node = state.parse_source(&source, false)?;
        let mut json = node
            .to_pretty_json()
            .with_context(|| format!("encoding {}", source.label))?;
        json.push('\n');
        json
    } else {
        source.text.clone()
    };

    if state.ctx.dry_run {
        println!("[dry-run] would write {}", exchange::export_path(&dest));
        return Ok(());
    }

    let written = exchange::export(&dest, &text, args.force)?;
    println!("Exported {} to {}", source.label, written);
    Ok(())
}

fn handle_config_only(ctx: &CliContext, command: Option<ConfigCommand>) -> Result<()> {
    let resolved = ctx.resolve_config_path()?;
    let config_path = resolved.path;
    match command {
        Some(ConfigCommand::Path) => {
            println!("Config path: {} ({})", config_path, resolved.source.as_str());
            Ok(())
        }
        None | Some(ConfigCommand::Show) => {
            if !config_path.exists() {
                println!("No config found at {}; using defaults.", config_path);
                println!("Use `folderforge config generate` to scaffold a default configuration.");
                return Ok(());
            }

            let config = config::load_from_path(&config_path)?;
            println!("Config path: {} ({})", config_path, resolved.source.as_str());
            print!("{}", config::format_summary(&config, &config_path));
            Ok(())
        }
        Some(ConfigCommand::Generate { path, force }) => {
            let target = match path {
                Some(path) => utf8_path(path, "config generate path")?,
                None => config_path.clone(),
            };
            if ctx.dry_run {
                println!("[dry-run] would write example config to {}", target);
                return Ok(());
            }
            config::write_example_config(&target, force)?;
            if force {
                println!("Overwrote config at {}", target);
            } else {
                println!("Wrote example config to {}", target);
            }
            Ok(())
        }
    }
}

fn utf8_path(path: PathBuf, what: &str) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| anyhow!("{} {} is not valid UTF-8", what, path.display()))
}

#[derive(Clone, Debug)]
struct CliContext {
    chdir: Option<PathBuf>,
    config: Option<PathBuf>,
    dry_run: bool,
}

impl CliContext {
    fn apply_chdir(&self) -> Result<()> {
        if let Some(path) = &self.chdir {
            std::env::set_current_dir(path)
                .with_context(|| format!("changing directory to {}", path.display()))?;
        }
        Ok(())
    }

    fn resolve_config_path(&self) -> Result<ResolvedConfigPath> {
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|cwd| Utf8PathBuf::from_path_buf(cwd).ok());
        self.resolve_config_path_from(cwd.as_deref())
    }

    fn resolve_config_path_from(&self, cwd: Option<&Utf8Path>) -> Result<ResolvedConfigPath> {
        if let Some(path) = &self.config {
            return Ok(ResolvedConfigPath {
                path: utf8_path(path.clone(), "config path")?,
                source: ConfigPathSource::Explicit,
            });
        }

        if let Some(found) = cwd.and_then(config::discover) {
            return Ok(ResolvedConfigPath {
                path: found,
                source: ConfigPathSource::Discovered,
            });
        }

        Ok(ResolvedConfigPath {
            path: config::home_default()?,
            source: ConfigPathSource::HomeDefault,
        })
    }
}

impl From<&Cli> for CliContext {
    fn from(cli: &Cli) -> Self {
        Self {
            chdir: cli.chdir.clone(),
            config: cli.config.clone(),
            dry_run: cli.dry_run,
        }
    }
}

/// Structure text plus a human-readable name for where it came from.
struct Source {
    text: String,
    label: String,
}

struct AppState {
    ctx: CliContext,
    config_path: Utf8PathBuf,
    config: ForgeConfig,
}

impl AppState {
    fn new(ctx: CliContext) -> Result<Self> {
        let resolved = ctx.resolve_config_path()?;
        let config = match resolved.source {
            ConfigPathSource::Explicit => config::load_from_path(&resolved.path)?,
            ConfigPathSource::Discovered | ConfigPathSource::HomeDefault => {
                config::load_or_default(&resolved.path)?
            }
        };
        info!(
            path = %resolved.path,
            source = resolved.source.as_str(),
            strict = config.strict(),
            "configuration resolved"
        );

        Ok(Self {
            ctx,
            config_path: resolved.path,
            config,
        })
    }

    fn templates(&self) -> Result<TemplateLibrary> {
        let user_dir = self.config.template_dir(&self.config_path);
        TemplateLibrary::load(user_dir.as_deref())
    }

    fn read_source(&self, args: &SourceArgs) -> Result<Source> {
        match (&args.structure_file, &args.template) {
            (Some(file), _) => {
                let path = utf8_path(file.clone(), "structure file")?;
                let text = exchange::import(&path)?;
                Ok(Source {
                    text,
                    label: path.to_string(),
                })
            }
            (None, Some(name)) => {
                let text = self.templates()?.read(name)?;
                Ok(Source {
                    text,
                    label: format!("template `{}`", name),
                })
            }
            (None, None) => bail!("pass a structure file or --template <name>"),
        }
    }

    fn parse_source(&self, source: &Source, strict: bool) -> Result<StructureNode> {
        if strict || self.config.strict() {
            return structure::parse_strict(&source.text)
                .with_context(|| format!("parsing {}", source.label));
        }
        Ok(structure::parse(&source.text))
    }
}

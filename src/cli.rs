use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI definition.
///
/// `folderforge <base_dir> <structure_file>` is accepted as shorthand for
/// `folderforge create <base_dir> <structure_file>`. A base directory named
/// like a subcommand (`export`, `config`, `template`) is still read as the
/// shorthand when the subcommand itself does not parse. `preview <file>` is a
/// valid preview, so use `create preview <file>` (or `./preview`) there;
/// `create` is always the unambiguous spelling.
#[derive(Parser, Debug)]
#[command(
    name = "folderforge",
    version,
    about = "Create nested folder trees from JSON or plain-text structures"
)]
pub struct Cli {
    #[arg(short = 'C', long = "chdir", global = true)]
    pub chdir: Option<PathBuf>,
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    #[arg(short = 'n', long = "dry-run", global = true)]
    pub dry_run: bool,
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the folders described by a structure file or template under a base directory.
    Create(CreateArgs),
    /// Print the folder outline a structure describes without creating anything.
    Preview(PreviewArgs),
    /// Browse the built-in and user template library.
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
    /// Save structure text to a `.json` file.
    Export(ExportArgs),
    /// Configuration display and template generation.
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommand>,
    },
    #[command(external_subcommand)]
    External(Vec<String>),
}

/// Where the structure text comes from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Structure file: a JSON document, or one folder name per line.
    #[arg(required_unless_present = "template", conflicts_with = "template")]
    pub structure_file: Option<PathBuf>,
    /// Use a named template instead of a structure file.
    #[arg(short = 't', long = "template")]
    pub template: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Directory the structure is created under; missing parents are created.
    pub base_dir: PathBuf,
    #[command(flatten)]
    pub source: SourceArgs,
    /// Reject input that is not valid JSON instead of reading it line by line.
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// List available templates.
    List,
    /// Print a template's structure text.
    Show { name: String },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destination; `.json` is appended when missing.
    pub dest: PathBuf,
    /// Structure file to export.
    #[arg(long = "from", required_unless_present = "template", conflicts_with = "template")]
    pub from: Option<PathBuf>,
    /// Template to export.
    #[arg(short = 't', long = "template")]
    pub template: Option<String>,
    /// Write the parsed structure as pretty JSON instead of the original text.
    #[arg(long = "canonical")]
    pub canonical: bool,
    #[arg(long = "force", default_value_t = false)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    Show,
    Path,
    Generate {
        #[arg()]
        path: Option<PathBuf>,
        #[arg(long = "force", default_value_t = false)]
        force: bool,
    },
}

/// Subcommands a bare-form base directory can collide with.
const SUBCOMMANDS: [&str; 4] = ["preview", "template", "export", "config"];

/// Flags whose value is the following argument.
const VALUE_FLAGS: [&str; 6] = ["-C", "--chdir", "-c", "--config", "-t", "--template"];

/// Helper entry point so `main` can stay minimal.
pub fn parse() -> Cli {
    try_parse_args(std::env::args_os()).unwrap_or_else(|err| err.exit())
}

/// Parse `args`, retrying as `create` when the first positional names a
/// subcommand that cannot take the remaining arguments.
pub fn try_parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let err = match Cli::try_parse_from(&argv) {
        Ok(cli) => return Ok(cli),
        Err(err) => err,
    };

    if matches!(
        err.kind(),
        ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    ) {
        return Err(err);
    }

    match rewrite_bare_form(&argv) {
        Some(rewritten) => Cli::try_parse_from(rewritten).map_err(|_| err),
        None => Err(err),
    }
}

/// Insert `create` before a leading subcommand name that is followed by
/// exactly one more positional.
fn rewrite_bare_form(argv: &[OsString]) -> Option<Vec<OsString>> {
    let mut index = 1;
    while let Some(arg) = argv.get(index) {
        let arg = arg.to_str()?;
        if arg == "--" {
            return None;
        }
        if VALUE_FLAGS.contains(&arg) {
            index += 2;
        } else if arg.starts_with('-') {
            index += 1;
        } else {
            break;
        }
    }

    let first = argv.get(index)?.to_str()?;
    if !SUBCOMMANDS.contains(&first) {
        return None;
    }

    let mut positionals = 0usize;
    let mut rest = argv[index + 1..].iter();
    while let Some(arg) = rest.next() {
        let arg = arg.to_string_lossy();
        if VALUE_FLAGS.contains(&arg.as_ref()) {
            rest.next();
        } else if !arg.starts_with('-') {
            positionals += 1;
        }
    }
    if positionals != 1 {
        return None;
    }

    let mut rewritten = argv.to_vec();
    rewritten.insert(index, OsString::from("create"));
    Some(rewritten)
}

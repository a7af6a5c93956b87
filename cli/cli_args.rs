use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        short = 'C',
        long,
        help = "Run as if started in PATH (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub working_dir: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xtools/shout/shout.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config: bool,

    #[arg(
        long,
        help = "Specify the project name (overrides config/dir name).",
        value_name = "NAME",
        help_heading = "Project Setup"
    )]
    pub project_name: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ScanOpts {
    #[arg(
        short = 'd',
        long,
        value_delimiter = ',',
        value_name = "DIRS",
        help = "Directories or files to scan, comma-separated (default: .).",
        help_heading = "Scanning"
    )]
    pub directories: Vec<String>,

    #[arg(
        short = 'e',
        long,
        value_delimiter = ',',
        value_name = "EXTS",
        help = "Only include files with these extensions, comma-separated.",
        help_heading = "Scanning"
    )]
    pub extensions: Vec<String>,

    #[arg(
        short = 's',
        long,
        value_delimiter = ',',
        value_name = "PATTERNS",
        help = "Glob patterns or directories to skip, comma-separated.",
        help_heading = "Scanning"
    )]
    pub skip: Vec<String>,

    #[arg(
        long,
        help = "Do not import .gitignore entries as skip patterns.",
        conflicts_with = "enable_gitignore",
        help_heading = "Scanning"
    )]
    pub disable_gitignore: bool,

    #[arg(
        long,
        help = "Import .gitignore entries as skip patterns [default].",
        conflicts_with = "disable_gitignore",
        help_heading = "Scanning"
    )]
    pub enable_gitignore: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Dump a project into a single Markdown document for LLMs.",
    long_about = "shout walks the given directories and writes one Markdown document holding \nthe project structure, optional version history and the content of every \nfile that passes the skip patterns and extension filter.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  shout generate -e rs,toml -s target\n  shout generate -d src,docs -o context.md -m\n  shout tree\n  shout tokens src/main.rs",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Generate the project document."
    )]
    Generate(GenerateArgs),

    #[command(visible_alias = "t", about = "Print the project structure tree.")]
    Tree(TreeArgs),

    #[command(
        visible_alias = "k",
        about = "Estimate heuristic token counts for files."
    )]
    Tokens(TokensArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub scan: ScanOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Output file (default: llm.md).",
        help_heading = "Output Control"
    )]
    pub output: Option<String>,

    #[arg(
        short = 'm',
        long,
        help = "Also write a <output>.meta.md summary.",
        help_heading = "Output Control"
    )]
    pub meta: bool,

    #[arg(
        long,
        value_name = "DEPTH",
        num_args = 0..=1,
        help = "Include version history; optional DEPTH commits (default: 10).",
        help_heading = "Output Control"
    )]
    pub history: Option<Option<usize>>,

    #[arg(
        long,
        help = "Try the external `tree` command before the built-in renderer.",
        help_heading = "Output Control"
    )]
    pub tree_command: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        short = 'd',
        long,
        value_delimiter = ',',
        value_name = "DIRS",
        help = "Directories to show, comma-separated (default: .).",
        help_heading = "Scanning"
    )]
    pub directories: Vec<String>,

    #[arg(
        long,
        help = "Try the external `tree` command before the built-in renderer."
    )]
    pub tree_command: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TokensArgs {
    #[arg(required = true, value_name = "FILES", help = "Files to estimate.")]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,

    #[arg(
        long,
        help = "Write the default config to .xtools/shout/shout.toml instead of printing it."
    )]
    pub save: bool,

    #[arg(long, requires = "save", help = "Overwrite an existing config file.")]
    pub force: bool,
}

use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P', global = true)]
    pub proxy: Option<String>,

    /// Set request headers
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Option<Vec<String>>,

    /// Set user agent
    #[arg(required = false, long, short = 'A', global = true)]
    pub user_agent: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum RepoAction {
    /// Register a repository and sync it
    #[command(arg_required_else_help = true)]
    Add {
        /// Display name; the id is derived from it unless --id is given
        name: String,

        /// Base URL of the repository
        url: String,

        /// Use an explicit repository id
        #[arg(required = false, long)]
        id: Option<String>,

        /// Bearer token sent with every request
        #[arg(required = false, long)]
        token: Option<String>,
    },

    /// Unregister a repository
    #[command(arg_required_else_help = true)]
    #[clap(visible_alias = "rm")]
    Remove {
        /// Repository id
        id: String,
    },

    /// List registered repositories
    #[clap(visible_alias = "ls")]
    List,

    /// Enable a repository
    #[command(arg_required_else_help = true)]
    Enable {
        /// Repository id
        id: String,
    },

    /// Disable a repository
    #[command(arg_required_else_help = true)]
    Disable {
        /// Repository id
        id: String,
    },

    /// Set or clear the bearer token of a repository
    #[command(arg_required_else_help = true)]
    Token {
        /// Repository id
        id: String,

        /// New token. Omit to clear the current one
        token: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate default config
    #[clap(name = "defconfig")]
    DefConfig,

    /// Manage repositories
    #[clap(name = "repo", visible_alias = "repos")]
    Repo {
        #[clap(subcommand)]
        action: RepoAction,
    },

    /// Sync repository listings
    #[clap(name = "sync", visible_alias = "S", visible_alias = "fetch")]
    Sync {
        /// Sync only this repository
        id: Option<String>,

        /// Only sync repositories whose listing is stale
        #[arg(required = false, long, conflicts_with = "id")]
        stale: bool,
    },

    /// Search modpacks in synced listings
    #[clap(name = "search", visible_alias = "s", visible_alias = "find")]
    Search {
        /// Query to search. Empty lists everything
        #[arg(default_value = "")]
        query: String,

        /// Only show packs supporting this game version
        #[arg(required = false, long, short = 'm')]
        mc_version: Option<String>,

        /// Limit number of results
        #[arg(required = false, long)]
        limit: Option<usize>,
    },

    /// Show modpack details
    #[command(arg_required_else_help = true)]
    #[clap(name = "info", visible_alias = "query", visible_alias = "Q")]
    Info {
        /// Repository id
        repo: String,

        /// Modpack id
        package: String,
    },

    /// Download a modpack artifact
    #[command(arg_required_else_help = true)]
    #[clap(name = "download", visible_alias = "dl")]
    Download {
        /// Repository id
        repo: String,

        /// Modpack id
        package: String,

        /// Output file or directory
        #[arg(required = false, short, long, value_hint = ValueHint::AnyPath)]
        output: Option<String>,
    },

    /// Download a modpack icon
    #[command(arg_required_else_help = true)]
    #[clap(name = "icon")]
    Icon {
        /// Repository id
        repo: String,

        /// Modpack id
        package: String,

        /// Output file or directory
        #[arg(required = false, short, long, value_hint = ValueHint::AnyPath)]
        output: Option<String>,
    },

    /// Remove cache snapshots of unregistered repositories
    #[clap(name = "clean")]
    Clean,
}

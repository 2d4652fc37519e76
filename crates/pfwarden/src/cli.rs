//! Clap derive structures for the `pfwarden` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// pfwarden -- manage pfSense firewalls from the command line
#[derive(Debug, Parser)]
#[command(
    name = "pfwarden",
    version,
    about = "Manage pfSense firewall configuration from the command line",
    long_about = "Drives the pfSense web administration console the way a browser would.\n\n\
        Reads configuration through the diagnostic script page and writes it by\n\
        submitting the console's own edit forms.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Console profile to use
    #[arg(long, short = 'p', env = "PFWARDEN_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Console URL (overrides profile)
    #[arg(long, short = 'u', env = "PFWARDEN_URL", global = true)]
    pub url: Option<String>,

    /// Console username (overrides profile)
    #[arg(long, env = "PFWARDEN_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PFWARDEN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "PFWARDEN_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "PFWARDEN_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one key per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage firewall host/network aliases
    #[command(alias = "ipa")]
    IpAliases(ResourceArgs),

    /// Manage firewall port aliases
    #[command(alias = "pa")]
    PortAliases(ResourceArgs),

    /// Manage DNS resolver domain overrides
    #[command(alias = "do")]
    DomainOverrides(ResourceArgs),

    /// Manage DNS resolver host overrides
    #[command(alias = "ho")]
    HostOverrides(ResourceArgs),

    /// Manage DHCPv4 static mappings on an interface
    #[command(alias = "sm")]
    StaticMappings(StaticMappingsArgs),

    /// Activate pending changes
    Apply(ApplyArgs),

    /// Run a PHP snippet through the diagnostic script console
    Exec(ExecArgs),

    /// Print a configuration subtree as JSON
    Read {
        /// Slash-separated config path (e.g., "unbound/hosts")
        path: String,
    },

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RESOURCES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ResourceArgs {
    #[command(subcommand)]
    pub command: ResourceCommand,
}

/// CRUD verbs shared by every keyed resource.
#[derive(Debug, Subcommand)]
pub enum ResourceCommand {
    /// List all records
    #[command(alias = "ls")]
    List,

    /// Show one record by its key
    Get {
        /// Natural key (alias name, domain, or host FQDN)
        key: String,
    },

    /// Create a record from a JSON file
    Create {
        /// JSON file holding the record
        #[arg(long = "from-file", short = 'F', value_name = "PATH")]
        from_file: PathBuf,
    },

    /// Replace a record (matched by key) from a JSON file
    Update {
        /// JSON file holding the record
        #[arg(long = "from-file", short = 'F', value_name = "PATH")]
        from_file: PathBuf,
    },

    /// Delete a record by its key
    #[command(alias = "rm")]
    Delete {
        /// Natural key (alias name, domain, or host FQDN)
        key: String,
    },
}

#[derive(Debug, Args)]
pub struct StaticMappingsArgs {
    /// DHCP interface (e.g., "lan", "opt1")
    #[arg(long, short = 'i', default_value = "lan", global = true)]
    pub interface: String,

    #[command(subcommand)]
    pub command: StaticMappingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum StaticMappingsCommand {
    /// List mappings on the interface
    #[command(alias = "ls")]
    List,

    /// Show one mapping
    Get {
        /// Client MAC address
        #[arg(value_name = "MAC")]
        mac: String,
    },

    /// Create a mapping from a JSON file
    Create {
        #[arg(long = "from-file", short = 'F', value_name = "PATH")]
        from_file: PathBuf,
    },

    /// Replace a mapping (matched by MAC) from a JSON file
    Update {
        #[arg(long = "from-file", short = 'F', value_name = "PATH")]
        from_file: PathBuf,
    },

    /// Delete a mapping
    #[command(alias = "rm")]
    Delete {
        /// Client MAC address
        #[arg(value_name = "MAC")]
        mac: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  APPLY / EXEC
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(subcommand)]
    pub command: ApplyCommand,
}

#[derive(Debug, Subcommand)]
pub enum ApplyCommand {
    /// Reload the packet filter (activates alias changes)
    Filter,

    /// Restart the DNS resolver with pending overrides
    DnsResolver,

    /// Activate pending DHCPv4 changes on an interface
    Dhcp {
        /// DHCP interface
        #[arg(long, short = 'i', default_value = "lan")]
        interface: String,
    },
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// PHP code to run. Whatever it prints is parsed as JSON.
    pub command: String,

    /// Hold the exclusive script lock (use when the snippet writes config)
    #[arg(long, short = 'w')]
    pub write: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Profile name (defaults to active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(version, about = "Keep DreamHost DNS A records pointed at this machine's public IPv4 address", long_about = None)]
pub struct Args {
    /// Settings file (JSON with api_key and domains)
    #[arg(long)]
    pub file: Option<String>,

    /// DreamHost API key, overrides the settings file
    #[arg(long)]
    pub api_key: Option<String>,

    /// Domain(s) to keep updated (comma-separated), overrides the settings file
    #[arg(long)]
    pub domains: Option<String>,

    /// Manually specify the IPv4 address (instead of auto-detection)
    #[arg(long)]
    pub ip: Option<String>,

    /// Echo service used to discover the external IP
    #[arg(long)]
    pub ip_service: Option<String>,

    /// DreamHost API base URL
    #[arg(long)]
    pub server: Option<String>,

    /// Timeout in seconds for every HTTP request
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Outcome log file path
    #[arg(long)]
    pub log_file: Option<String>,

    /// Do not write the outcome log file
    #[arg(long, default_value = "false")]
    pub no_log_file: bool,

    /// Test mode - list records and show what would happen without changing anything
    #[arg(long, default_value = "false")]
    pub test: bool,

    /// Verbose output
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Debug output
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(long, default_value = "false")]
    pub quiet: bool,
}

impl Args {
    pub fn new() -> Self {
        Self::parse()
    }
}

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use plugin_client::LoginMethod;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "qmcred",
    author,
    version,
    about = "Log in to the order_qqmusic plugin by QR code and manage its stored credential",
    long_about = None
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend host (`ip` or `ip:port`), overrides the page URL
    #[arg(long, global = true, env = "QMCRED_IP")]
    pub ip: Option<String>,

    /// URL of the plugin's web page; its `ip` parameter or host selects the backend
    #[arg(long, global = true, env = "QMCRED_PAGE_URL")]
    pub page_url: Option<String>,

    /// Port to use when the backend host has none
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in by scanning a QR code
    Login {
        /// Account type to scan with (asks when omitted)
        #[arg(value_enum)]
        method: Option<MethodArg>,

        /// Where to write the QR code image
        #[arg(short = 'o', long)]
        qr_output: Option<PathBuf>,

        /// Give up after this many seconds
        #[arg(long)]
        poll_timeout: Option<u64>,
    },

    /// Check whether the stored credential is valid
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Refresh the stored credential
    Refresh {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Show the stored credential
    Info {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,

        /// Write the output to a file instead of stdout
        #[arg(short = 'f', long)]
        output_file: Option<PathBuf>,
    },

    /// Copy the stored credential as JSON to the clipboard
    Copy,

    /// Delete the stored credential
    Delete {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show or reset configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodArg {
    /// QQ account
    Qq,
    /// WeChat
    Wx,
    /// QQ Music mobile client
    Mobile,
}

impl From<MethodArg> for LoginMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Qq => LoginMethod::QqAccount,
            MethodArg::Wx => LoginMethod::Wechat,
            MethodArg::Mobile => LoginMethod::MobileClient,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored output
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// Compact JSON output
    JsonCompact,
    /// Table output
    Table,
    /// HTML fragment
    Html,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonCompact)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Commands {
    /// Output format selected for this command, if it has one.
    pub fn output_format(&self) -> Option<OutputFormat> {
        match self {
            Self::Status { output } | Self::Refresh { output } | Self::Info { output, .. } => {
                Some(*output)
            }
            _ => None,
        }
    }
}

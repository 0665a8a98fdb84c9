//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "companion-cli",
    about = "Run the companion server and call it from the command line",
    version,
    long_about = None
)]
pub struct Cli {
    /// JSON config file. Missing file means defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Port for the companion, overriding config and environment.
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory for `companion-cli.log` (default: the user cache directory).
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log at trace level.
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute script code in the companion.
    #[command(group(ArgGroup::new("source").required(true).args(["code", "file"])))]
    Exec {
        /// Inline code.
        #[arg(long)]
        code: Option<String>,

        /// File containing the code.
        #[arg(long)]
        file: Option<PathBuf>,

        /// JSON object passed to the script as `jsParams`.
        #[arg(long)]
        params: Option<String>,
    },

    /// Mint a new wallet.
    CreateWallet,

    /// Sign a payload with a wallet key.
    Sign {
        /// Hex payload to sign.
        #[arg(long)]
        to_sign: String,

        /// Public key of the signing wallet.
        #[arg(long)]
        pkp_public_key: String,
    },

    /// Show the wallet stored in the companion, if any.
    Pkp,

    /// Hand the companion the token from `COMPANION_AUTH_TOKEN`.
    SetAuthToken,

    /// Start (or find) the companion and report that it is ready.
    Ready,
}

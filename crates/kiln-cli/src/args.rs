//! Command-line grammar, one subcommand per operation of spec §6.

use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "kiln", about = "Sync client for a content-addressed repository graph")]
pub struct Args {
    /// Emit the same JSON envelope the HTTP API returns, instead of
    /// human-readable text.
    #[structopt(long, global = true)]
    pub json: bool,

    /// Log verbosity passed to `tracing_subscriber`.
    #[structopt(long, global = true, default_value = "warn")]
    pub log: tracing::Level,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Write the named branch's full history to a single file.
    Bundle {
        /// Repository to read from.
        path: PathBuf,
        /// Branch to bundle. Defaults to `main`.
        #[structopt(long, default_value = "main")]
        branch: String,
        /// File to write the bundle to.
        #[structopt(long)]
        output: PathBuf,
    },

    /// Apply a bundle file produced by `bundle` onto a branch.
    Unbundle {
        /// Repository to apply the bundle onto.
        path: PathBuf,
        /// Bundle file to read.
        file: PathBuf,
        /// Branch to apply the bundle to. Defaults to `main`.
        #[structopt(long, default_value = "main")]
        branch: String,
    },

    /// Create a new local repository by cloning a remote one.
    Clone {
        /// Base URL of the remote's HTTP API.
        remote_url: String,
        /// Local path to clone into.
        path: PathBuf,
        /// Bearer token to authenticate with.
        #[structopt(long, default_value = "")]
        token: String,
    },

    /// Fetch a remote's branches into the local remote-tracking repository,
    /// without touching any local branch.
    Fetch {
        path: PathBuf,
        #[structopt(long, default_value = "origin")]
        remote: String,
        #[structopt(long, default_value = "")]
        token: String,
    },

    /// Push a local branch to a remote.
    Push {
        path: PathBuf,
        #[structopt(long, default_value = "main")]
        branch: String,
        #[structopt(long, default_value = "origin")]
        remote: String,
        #[structopt(long, default_value = "")]
        token: String,
    },

    /// Fast-forward a local branch from a remote.
    Pull {
        path: PathBuf,
        #[structopt(long, default_value = "main")]
        branch: String,
        #[structopt(long, default_value = "origin")]
        remote: String,
        #[structopt(long, default_value = "")]
        token: String,
    },

    /// Print the commits reachable from a branch, oldest first.
    Log {
        path: PathBuf,
        #[structopt(long, default_value = "main")]
        branch: String,
    },
}

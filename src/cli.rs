use clap::{Parser, Subcommand};

/// tokend — API token lifecycle service
#[derive(Parser)]
#[command(name = "tokend", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the token service
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8300")]
        port: u16,
    },

    /// Manage tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Manage user token policy attributes
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Mint a token. The CLI is a trusted path and may set reserved intents.
    Create {
        /// Owning user
        #[arg(long)]
        user: String,
        /// Identifier (generated when omitted)
        #[arg(long)]
        identifier: Option<String>,
        /// Intent: api, app_password, recovery, verification, internal_service
        #[arg(long)]
        intent: Option<String>,
        /// Expiry as RFC 3339 timestamp
        #[arg(long)]
        expires: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List tokens (all, or one user's)
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Rotate a token's key
    Rotate {
        #[arg(long)]
        identifier: String,
        /// Explicit key (generated when omitted)
        #[arg(long)]
        key: Option<String>,
    },
    /// Delete a token
    Delete {
        #[arg(long)]
        identifier: String,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Set a user's attribute object (JSON). Malformed policy values are rejected.
    SetAttributes {
        #[arg(long)]
        user: String,
        /// e.g. '{"token_expiring": true, "token_maximum_lifetime": "hours=2"}'
        #[arg(long)]
        attributes: String,
    },
}

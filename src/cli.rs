use clap::{Parser, Subcommand};

/// cattery: token-authenticated cat registry
#[derive(Parser)]
#[command(name = "cattery", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Issue or inspect bearer tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Inspect the cat registry
    Cat {
        #[command(subcommand)]
        command: CatCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Print a fresh bearer token for an email (no password check)
    Issue {
        #[arg(long)]
        email: String,
    },
    /// Validate a token and print its subject and remaining lifetime
    Inspect { token: String },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CATTERY_USER_PASSWORD")]
        password: String,
    },
    /// List registered users
    List,
}

#[derive(Subcommand)]
pub enum CatCommands {
    /// List every cat
    List,
}

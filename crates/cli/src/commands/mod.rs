// CLI subcommand dispatch and shared connection flags.

use anyhow::Context;
use clap::{Args, Subcommand};

use festa_chat::config::ClientConfig;
use festa_chat::http::HttpChatBackend;

pub mod delete;
pub mod leave;
pub mod room;
pub mod send;
pub mod unread;
pub mod watch;

#[derive(Subcommand)]
pub enum Command {
    /// Show a chat room's metadata
    Room(room::RoomArgs),
    /// Show the total unread message count
    Unread(unread::UnreadArgs),
    /// Open a room and chat interactively
    Watch(watch::WatchArgs),
    /// Send a single message to a room
    Send(send::SendArgs),
    /// Leave a room (membership removal; forfeits read state)
    Leave(leave::LeaveArgs),
    /// Delete a room
    Delete(delete::DeleteArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Room(args) => room::run(args),
        Command::Unread(args) => unread::run(args),
        Command::Watch(args) => watch::run(args),
        Command::Send(args) => send::run(args),
        Command::Leave(args) => leave::run(args),
        Command::Delete(args) => delete::run(args),
    }
}

/// Connection flags shared by all commands. Flags override the config
/// file; the token falls back to `FESTA_TOKEN`.
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// REST API base URL (overrides config).
    #[arg(long)]
    api_url: Option<String>,

    /// Realtime endpoint URL (overrides config).
    #[arg(long)]
    ws_url: Option<String>,

    /// Username (overrides config).
    #[arg(long)]
    username: Option<String>,

    /// Access token (overrides the FESTA_TOKEN environment variable).
    #[arg(long)]
    token: Option<String>,
}

/// Resolved configuration for one command invocation.
pub struct CommandContext {
    pub config: ClientConfig,
    pub username: String,
    pub token: Option<String>,
}

impl ConnectionArgs {
    pub fn resolve(&self) -> anyhow::Result<CommandContext> {
        let mut config = ClientConfig::load();
        if let Some(api_url) = &self.api_url {
            config.api_base_url = api_url.clone();
        }
        if let Some(ws_url) = &self.ws_url {
            config.ws_url = ws_url.clone();
        }
        if let Some(username) = &self.username {
            config.username = Some(username.clone());
        }
        config.validate()?;

        let username = config
            .username
            .clone()
            .context("no username: pass --username or set it in ~/.festa/config.toml")?;
        let token = self.token.clone().or_else(|| std::env::var("FESTA_TOKEN").ok());

        Ok(CommandContext { config, username, token })
    }
}

impl CommandContext {
    /// A REST client carrying the resolved bearer token, if any.
    pub fn backend(&self) -> anyhow::Result<HttpChatBackend> {
        let mut backend = HttpChatBackend::new(self.config.api_base_url.clone())?;
        if let Some(token) = &self.token {
            backend.set_access_token(token.clone());
        }
        Ok(backend)
    }

    pub fn require_token(&self) -> anyhow::Result<&str> {
        self.token
            .as_deref()
            .context("no access token: pass --token or set FESTA_TOKEN")
    }
}

#![allow(missing_docs)]

//! gg-push — send rich-text messages through the Botmaster gateway.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use gg_botapi::config::BotConfig;
use gg_botapi::credentials::{load_credentials, Credentials};
use gg_botapi::gateway::auth::BotApiAuthorization;
use gg_botapi::gateway::http::HttpBotmaster;
use gg_botapi::gateway::{PushConnection, StatusKind};
use gg_botapi::message::MessageBuilder;

#[derive(Parser)]
#[command(name = "gg-push", version, about = "Gadu-Gadu BotAPI push client")]
struct Cli {
    /// Path to the credentials .env file.
    #[arg(long, default_value = ".env")]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and send one message.
    Send {
        /// Recipient GG numbers.
        #[arg(long = "to", required = true, value_delimiter = ',')]
        to: Vec<u64>,

        /// BBCode body ([b], [i], [u], [color=#rrggbb], [br]).
        #[arg(long, conflicts_with_all = ["text", "html"])]
        markup: Option<String>,

        /// Plain-text body.
        #[arg(long, conflicts_with = "html")]
        text: Option<String>,

        /// Raw HTML body (no plain-text fallback is derived).
        #[arg(long)]
        html: Option<String>,

        /// Image file to attach; may be repeated.
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// Skip recipients that are currently offline.
        #[arg(long)]
        no_offline: bool,
    },

    /// Set the bot's presence status.
    Status {
        /// Status kind; clears the status when omitted.
        #[arg(long, value_enum)]
        kind: Option<StatusArg>,

        /// Status description.
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Check whether a GG number is registered as a bot.
    IsBot {
        /// The number to check.
        ggid: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusArg {
    Back,
    Away,
    Ffc,
    Dnd,
    Invisible,
}

impl From<StatusArg> for StatusKind {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Back => StatusKind::Back,
            StatusArg::Away => StatusKind::Away,
            StatusArg::Ffc => StatusKind::FreeForChat,
            StatusArg::Dnd => StatusKind::DoNotDisturb,
            StatusArg::Invisible => StatusKind::Invisible,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    gg_botapi::logging::init();

    let cli = Cli::parse();
    let config = BotConfig::load().context("failed to load configuration")?;

    let credentials = match load_credentials(&cli.credentials) {
        Ok(credentials) => credentials,
        Err(error) => {
            warn!(%error, "no credentials loaded, connection will be unauthorized");
            Credentials::default()
        }
    };

    let api = HttpBotmaster::new(
        config.bot.number,
        config.gateway.base_url.clone(),
        config.bot.api_version.clone(),
        Duration::from_secs(config.gateway.timeout_seconds),
    )
    .context("failed to build gateway client")?;
    let api: Arc<dyn gg_botapi::gateway::BotmasterApi> = Arc::new(api);

    let auth = BotApiAuthorization::obtain(api.as_ref(), &credentials).await;
    let connection = PushConnection::new(api, auth);

    match cli.command {
        Command::Send {
            to,
            markup,
            text,
            html,
            images,
            no_offline,
        } => {
            let mut message = MessageBuilder::new();
            message
                .set_recipients(&to)
                .set_send_to_offline(!no_offline);
            if let Some(markup) = markup {
                message.add_markup(&markup);
            }
            if let Some(text) = text {
                message.add_plain(&text);
            }
            if let Some(html) = html {
                message.set_raw_html(&html);
            }
            for path in &images {
                message
                    .add_image_file(path)
                    .with_context(|| format!("failed to attach {}", path.display()))?;
            }

            connection
                .push_one(&message)
                .await
                .context("message not delivered")?;
            println!("delivered to {} recipient(s)", message.recipients().len());
        }

        Command::Status { kind, description } => {
            let confirmed = connection
                .set_status(kind.map(StatusKind::from), &description)
                .await
                .context("status change failed")?;
            anyhow::ensure!(confirmed, "gateway did not confirm the status change");
            println!("status updated");
        }

        Command::IsBot { ggid } => {
            let bot = connection.is_bot(ggid).await.context("check failed")?;
            println!("{ggid}: {}", if bot { "bot" } else { "not a bot" });
        }
    }

    Ok(())
}

//! # playlab - chat with a Playlab app from the terminal
//!
//! Starts a conversation (or resumes one by id), shows the app's greeting and
//! then reads messages from stdin. Lines starting with `/` are commands.

use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use playlab::constants::{
    env_file_path, DEFAULT_LOG_FILTER, ENV_API_KEY, ENV_PROJECT_ID, RETRY_DELAYS_MS,
};
use playlab::display::Console;
use playlab::retry::{backoff_schedule, retry_with_backoff};
use playlab::{Config, ConversationClient, Credentials, RenderMode};

const HELP: &str = "\
Commands:
  /reset                 start a new conversation
  /load ID               resume an earlier conversation
  /history               list messages in this conversation
  /system                show the app's system prompt
  /id                    print the current conversation id
  /attach PATH MESSAGE   send MESSAGE with a file attached
  /help                  this text
  /quit                  exit
Anything else is sent as a message.";

/// playlab - chat with a Playlab app
#[derive(Parser, Debug)]
#[command(name = "playlab", version, about = "Chat with a Playlab app from the terminal")]
struct Cli {
    /// API key (falls back to PLAYLAB_API_KEY, then the config file)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Project (app) id (falls back to PLAYLAB_PROJECT_ID, then the config file)
    #[arg(long, short = 'p', value_name = "ID")]
    project_id: Option<String>,

    /// Resume this conversation instead of starting a new one
    #[arg(long, short = 'c', value_name = "ID")]
    conversation: Option<String>,

    /// Send a single message, print the reply and exit
    #[arg(long, short = 'm', value_name = "TEXT")]
    message: Option<String>,

    /// Attach a file to --message
    #[arg(long, short = 'f', value_name = "PATH", requires = "message")]
    file: Option<PathBuf>,

    /// Print replies as plain text (no math delimiter rewriting)
    #[arg(long)]
    plain: bool,

    /// Wait for the full reply instead of printing it as it streams
    #[arg(long)]
    no_stream: bool,

    /// Retry attempts for history/system-prompt fetches on network errors
    #[arg(long, default_value_t = 0)]
    retries: usize,
}

struct Repl {
    client: ConversationClient,
    console: Console<Stdout>,
    stream: bool,
    retries: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Credentials may live in .env files (never committed)
    let _ = dotenvy::from_path(env_file_path());
    let _ = dotenvy::dotenv();

    // Load and apply CLI overrides to config
    let mut config = Config::load();
    if cli.plain {
        config.render = RenderMode::Plain;
    }
    if cli.no_stream {
        config.stream = false;
    }

    // CLI > environment > config file
    let credentials = Credentials::resolve(cli.api_key.clone(), cli.project_id.clone(), |name| {
        std::env::var(name).ok().or_else(|| match name {
            ENV_API_KEY => config.api_key.clone(),
            ENV_PROJECT_ID => config.project_id.clone(),
            _ => None,
        })
    })?;

    let client = ConversationClient::connect(credentials, &config)?;
    let mut repl = Repl {
        client,
        console: Console::new(std::io::stdout(), config.render, config.wrap_width),
        stream: config.stream,
        retries: cli.retries,
    };

    let resumed = match &cli.conversation {
        Some(id) => Some(
            repl.client
                .load_conversation(id)
                .await
                .with_context(|| format!("Failed to load conversation {}", id))?,
        ),
        None => None,
    };

    if let Some(message) = &cli.message {
        repl.console.user_turn(message)?;
        return repl.send(message, cli.file.as_deref()).await;
    }

    match resumed {
        Some(history) => {
            let id = repl.client.conversation_id().unwrap_or_default().to_string();
            repl.console.info(&format!("Resumed conversation {}", id))?;
            repl.console.transcript(&history)?;
        }
        None => repl.reset().await.context("Failed to start a conversation")?,
    }

    repl.run().await
}

impl Repl {
    async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break; // EOF
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match self.dispatch(line).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => self.console.error(&format!("{:#}", e))?,
            }
        }
        Ok(())
    }

    /// Handle one input line. Returns `false` to exit.
    async fn dispatch(&mut self, line: &str) -> Result<bool> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        match command {
            "/quit" | "/exit" => return Ok(false),
            "/help" => self.console.info(HELP)?,
            "/reset" => self.reset().await.context("Failed to reset chat")?,
            "/id" => {
                let id = self.client.conversation_id().unwrap_or("(none)").to_string();
                self.console.info(&id)?;
            }
            "/load" => {
                let history = self
                    .client
                    .load_conversation(rest)
                    .await
                    .context("Failed to load conversation")?;
                self.console.transcript(&history)?;
            }
            "/history" => {
                let client = &self.client;
                let delays = backoff_schedule(RETRY_DELAYS_MS, self.retries);
                let history = retry_with_backoff(move || client.list_messages(), &delays).await?;
                self.console.history(&history)?;
            }
            "/system" => {
                let client = &self.client;
                let delays = backoff_schedule(RETRY_DELAYS_MS, self.retries);
                let prompt =
                    retry_with_backoff(move || client.display_system_prompt(), &delays).await?;
                self.console.system_prompt(prompt.as_deref())?;
            }
            "/attach" => {
                let (path, message) = rest
                    .split_once(char::is_whitespace)
                    .map(|(p, m)| (p, m.trim()))
                    .unwrap_or((rest, ""));
                if path.is_empty() {
                    self.console.info("usage: /attach PATH MESSAGE")?;
                } else {
                    self.console.user_turn(&format!("{} [{}]", message, path))?;
                    self.send(message, Some(Path::new(path))).await?;
                }
            }
            _ if command.starts_with('/') => {
                self.console
                    .info(&format!("Unknown command {}. Type /help for a list.", command))?;
            }
            _ => self.send(line, None).await?,
        }
        Ok(true)
    }

    async fn reset(&mut self) -> Result<()> {
        if let Some(greeting) = self.client.reset_chat().await? {
            self.console.greeting(&greeting)?;
        }
        Ok(())
    }

    async fn send(&mut self, text: &str, file: Option<&Path>) -> Result<()> {
        if !self.stream {
            let reply = self.client.send_message(text, file).await?;
            self.console.assistant_turn(&reply.content)?;
            return Ok(());
        }

        let console = &mut self.console;
        let mut started = false;
        // First stdout failure; later chunks are dropped
        let mut write_error: Option<io::Error> = None;
        let result = self
            .client
            .stream_message(text, file, &mut |chunk| {
                if write_error.is_some() {
                    return;
                }
                let written = if started {
                    console.chunk(chunk)
                } else {
                    started = true;
                    console.begin_stream().and_then(|()| console.chunk(chunk))
                };
                if let Err(e) = written {
                    write_error = Some(e);
                }
            })
            .await;
        if let Some(e) = write_error {
            return Err(e).context("Failed to print reply");
        }
        if started {
            console.end_stream()?;
        }
        result?;
        Ok(())
    }
}

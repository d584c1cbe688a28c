//! `wavepool` is the Wave Pool developer portal on the command line.
//!
//! Account commands talk to the portal backend and keep their credentials in
//! the SQLite file named by `--token-db` / `WAVEPOOL_TOKEN_DB`, so a `login`
//! carries over to later invocations:
//!
//! - **`health`**, **`login`**, **`logout`**, **`me`**
//! - **`keys`**: list, create and revoke API keys.
//! - **`webhooks`**: list, create, update and delete webhooks.
//! - **`transactions`**: recent checkout sessions with their stats.
//!
//! Offline commands need no backend:
//!
//! - **`routes`**: print the route table, optionally as JSON schemas.
//! - **`check`**: check a JSON document against a route's schema and list
//!   every mismatch.
//! - **`view`**: show which portal screen a URL selects.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use wavepool_client::{
    store, Api, ClientConfig, FetchOptions, LoginOutcome, Location, MemoryHistory, Navigator,
    Session, View,
};
use wavepool_portal_api::{
    registry, ApiKeyId, CreateApiKeyRequest, CreateWebhookRequest, Credentials, SigningStrategy,
    TransactionStats, WebhookEvent, WebhookId, WebhookStatus,
};

/// wavepool: Wave Pool developer portal CLI
///
/// Manage API keys and webhooks and inspect transactions of a Wave Pool
/// business account.
#[derive(Parser)]
#[command(name = "wavepool", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Connection {
    /// Origin of the portal backend.
    #[arg(long, global = true, env = "WAVEPOOL_API_BASE", value_name = "URL")]
    api_base: Option<String>,

    /// SQLite file holding stored credentials.
    #[arg(long, global = true, env = "WAVEPOOL_TOKEN_DB", value_name = "PATH")]
    token_db: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Call the health check endpoint.
    Health,

    /// Sign in with phone number and PIN.
    Login {
        #[arg(long, value_name = "PHONE")]
        phone: String,

        /// Read from `WAVEPOOL_PIN` when not given.
        #[arg(long, env = "WAVEPOOL_PIN", hide_env_values = true, value_name = "PIN")]
        pin: String,
    },

    /// Revoke the stored refresh token and forget the credentials.
    Logout,

    /// Print the signed-in user and business.
    Me,

    /// Manage API keys.
    #[command(subcommand)]
    Keys(KeysCommand),

    /// Manage webhooks.
    #[command(subcommand)]
    Webhooks(WebhooksCommand),

    /// List recent checkout sessions.
    Transactions {
        /// Print the raw response as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print every declared route.
    Routes {
        /// Include input and output schemas, as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check a JSON document against a route's schema.
    ///
    /// Prints one line per mismatch and exits 1 if there are any. Pass `-`
    /// as FILE to read from stdin.
    ///
    /// Examples:
    ///   wavepool check "GET /api/v1/me" me.json
    ///   wavepool check "POST /api/v1/webhooks" --input body.json
    Check {
        /// Route key, e.g. "POST /api/v1/auth".
        route: String,

        /// Path to a JSON file, or `-` for stdin.
        file: PathBuf,

        /// Check against the input schema instead of the output schema.
        #[arg(long)]
        input: bool,
    },

    /// Show which screen a portal URL selects.
    View {
        url: String,

        /// Resolve as a signed-in user.
        #[arg(long)]
        signed_in: bool,
    },
}

#[derive(Subcommand)]
enum KeysCommand {
    List,

    /// Create a key and print its secret. The secret is shown only once.
    Create {
        /// Environment, e.g. "prod" or "test".
        #[arg(long, default_value = "test")]
        env: String,

        /// Granted scope. Repeat for several: --scope a --scope b
        #[arg(long = "scope", value_name = "SCOPE", required = true)]
        scopes: Vec<String>,
    },

    Revoke {
        key_id: String,
    },
}

#[derive(Subcommand)]
enum WebhooksCommand {
    List,

    Create {
        #[arg(long)]
        url: String,

        /// shared_secret | signing_secret
        #[arg(long, default_value = "signing_secret")]
        strategy: SigningStrategy,

        /// Subscribed event. Repeat for several.
        #[arg(long = "event", value_name = "EVENT", required = true)]
        events: Vec<WebhookEvent>,
    },

    /// Change a webhook. Unset options keep their current value.
    Update {
        webhook_id: String,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        strategy: Option<SigningStrategy>,

        /// Replaces the whole event list when given.
        #[arg(long = "event", value_name = "EVENT")]
        events: Vec<WebhookEvent>,

        /// active | revoked
        #[arg(long)]
        status: Option<WebhookStatus>,
    },

    Delete {
        webhook_id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wavepool=info,wavepool_client=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Routes { json } => print_routes(json),
        Command::Check { route, file, input } => check(&route, &file, input),
        Command::View { url, signed_in } => print_view(&url, signed_in),
        command => {
            let session = connect(cli.connection);
            run(&session, command).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Account commands
// ---------------------------------------------------------------------------

fn connect(connection: Connection) -> Session {
    let mut config = ClientConfig::from_env().unwrap_or_else(|e| fatal(&e.to_string()));
    if let Some(api_base) = connection.api_base {
        config.api_base = api_base.trim_end_matches('/').to_string();
    }
    if connection.token_db.is_some() {
        config.token_db = connection.token_db;
    }
    tracing::debug!(api_base = %config.api_base, token_db = ?config.token_db, "configured");

    let api = Api::from_config(&config).unwrap_or_else(|e| fatal(&e.to_string()));
    let store = store::open(&config).unwrap_or_else(|e| fatal(&e.to_string()));
    Session::new(api, store, config.expiry_margin)
}

async fn run(session: &Session, command: Command) {
    let api = session.api();
    match command {
        Command::Health => {
            let status = api
                .health
                .fetch((), &FetchOptions::new())
                .await
                .unwrap_or_else(|e| fatal(&e.to_string()));
            println!("{status}");
        }

        Command::Login { phone, pin } => {
            let outcome = session
                .login(Credentials { phone, pin })
                .await
                .unwrap_or_else(|e| fatal(&e.to_string()));
            match outcome {
                LoginOutcome::SignedIn(me) => {
                    println!("signed in as {} ({})", me.phone, me.business.name)
                }
                LoginOutcome::Rejected(message) => {
                    eprintln!("wavepool: login rejected: {message}");
                    process::exit(1);
                }
            }
        }

        Command::Logout => {
            session.logout().await.unwrap_or_else(|e| fatal(&e.to_string()));
            println!("signed out");
        }

        Command::Me => {
            let me = session
                .sync_user()
                .await
                .unwrap_or_else(|e| fatal(&e.to_string()))
                .unwrap_or_else(|| fatal("not signed in; run `wavepool login` first"));
            print_json(&me);
        }

        Command::Keys(KeysCommand::List) => {
            let keys = call(session.call(&api.list_api_keys, ()).await);
            for key in &keys {
                println!(
                    "{}  {:<6} {:<8} {}...  {}",
                    key.id,
                    key.env,
                    key.status,
                    key.prefix,
                    key.scopes.join(",")
                );
            }
            if keys.is_empty() {
                println!("no API keys");
            }
        }

        Command::Keys(KeysCommand::Create { env, scopes }) => {
            let created = call(
                session
                    .call(&api.create_api_key, CreateApiKeyRequest { env, scopes })
                    .await,
            );
            println!("id:     {}", created.id);
            println!("secret: {}", created.secret_key);
            eprintln!("store the secret now; it will not be shown again");
        }

        Command::Keys(KeysCommand::Revoke { key_id }) => {
            call(session.call(&api.revoke_api_key, ApiKeyId { key_id }).await);
            println!("revoked");
        }

        Command::Webhooks(WebhooksCommand::List) => {
            let webhooks = call(session.call(&api.list_webhooks, ()).await);
            for hook in &webhooks {
                let events: Vec<&str> = hook.events.iter().map(|e| e.as_str()).collect();
                println!(
                    "{}  {:<7} {}  [{}]",
                    hook.id,
                    hook.status,
                    hook.url,
                    events.join(",")
                );
            }
            if webhooks.is_empty() {
                println!("no webhooks");
            }
        }

        Command::Webhooks(WebhooksCommand::Create {
            url,
            strategy,
            events,
        }) => {
            let request = CreateWebhookRequest {
                url,
                signing_strategy: strategy,
                events,
            };
            let created = call(session.call(&api.create_webhook, request).await);
            println!("id:     {}", created.id);
            if let Some(secret) = &created.secret {
                println!("secret: {secret}");
                eprintln!("store the secret now; it will not be shown again");
            }
        }

        Command::Webhooks(WebhooksCommand::Update {
            webhook_id,
            url,
            strategy,
            events,
            status,
        }) => {
            let current = call(session.call(&api.list_webhooks, ()).await)
                .into_iter()
                .find(|w| w.id == webhook_id)
                .unwrap_or_else(|| fatal(&format!("no webhook with id {webhook_id}")));
            let mut update = current.to_update();
            if let Some(url) = url {
                update.url = url;
            }
            if let Some(strategy) = strategy {
                update.signing_strategy = strategy;
            }
            if !events.is_empty() {
                update.events = events;
            }
            if let Some(status) = status {
                update.status = status;
            }
            print_json(&call(session.call(&api.update_webhook, update).await));
        }

        Command::Webhooks(WebhooksCommand::Delete { webhook_id }) => {
            call(session.call(&api.delete_webhook, WebhookId { webhook_id }).await);
            println!("deleted");
        }

        Command::Transactions { json } => {
            let page = call(session.call(&api.checkout_sessions, ()).await);
            if json {
                print_json(&page);
                return;
            }
            let stats = TransactionStats::from_sessions(&page.sessions);
            println!(
                "{} sessions: {} successful, {} failed",
                stats.total, stats.successful, stats.failed
            );
            for s in &page.sessions {
                println!(
                    "{}  {:<9} {:>10} {}  {}",
                    s.id,
                    s.badge(),
                    s.amount,
                    s.currency,
                    s.when_created
                );
            }
        }

        Command::Routes { .. } | Command::Check { .. } | Command::View { .. } => {
            unreachable!("offline commands are dispatched in main")
        }
    }
}

fn call<T>(result: Result<T, wavepool_client::SessionError>) -> T {
    match result {
        Ok(value) => value,
        Err(wavepool_client::SessionError::SignedOut) => {
            fatal("not signed in; run `wavepool login` first")
        }
        Err(e) => fatal(&e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Offline commands
// ---------------------------------------------------------------------------

fn print_routes(json: bool) {
    let routes = registry();
    if json {
        let docs: Vec<Value> = routes.iter().map(|entry| entry.to_document()).collect();
        print_json(&docs);
        return;
    }
    for entry in routes.iter() {
        println!("{:<45} {}", entry.key.to_string(), entry.description);
    }
}

fn check(route: &str, file: &Path, input: bool) {
    let entry = registry()
        .lookup(route)
        .unwrap_or_else(|| fatal(&format!("unknown route {route:?}; see `wavepool routes`")));
    let schema = if input { &entry.input } else { &entry.output };
    let Some(schema) = schema else {
        let side = if input { "input" } else { "output" };
        fatal(&format!("{} declares no {side} schema", entry.key));
    };

    let text = read_input(file);
    let value: Value = serde_json::from_str(&text)
        .unwrap_or_else(|e| fatal(&format!("failed to parse input as JSON: {e}")));

    let failures = schema.report(&value);
    if failures.is_empty() {
        println!("valid");
        return;
    }
    for failure in &failures {
        eprintln!("{failure}");
    }
    process::exit(1);
}

fn print_view(url: &str, signed_in: bool) {
    let location = Location::parse(url).unwrap_or_else(|e| fatal(&e.to_string()));
    let resolved = View::resolve(&location, signed_in);
    match resolved.view {
        View::Login => println!("login"),
        View::DevPortal { tab, dialog } => match dialog {
            Some(dialog) => println!("dev-portal / {} / {}", tab.as_str(), dialog.as_str()),
            None => println!("dev-portal / {}", tab.as_str()),
        },
    }
    if let Some(redirect) = resolved.redirect {
        let navigator = Navigator::new(Arc::new(MemoryHistory::new(location.href())))
            .unwrap_or_else(|e| fatal(&e.to_string()));
        let target = navigator
            .resolve(&redirect)
            .unwrap_or_else(|e| fatal(&e.to_string()));
        println!("redirect: {}", target.href());
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => fatal(&format!("failed to encode output: {e}")),
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {e}")));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {e}", path.display())))
    }
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("wavepool: {msg}");
    process::exit(2);
}

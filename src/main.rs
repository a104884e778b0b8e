use std::path::PathBuf;
use std::sync::Arc;

use authgate::credential::FileCookies;
use authgate::signal::{Signal, drain};
use authgate::{
    ApiError, AppState, ClientConfig, ConfigError, CredentialStore, LoginForm, NavigationOutcome, OAuthError,
    OAuthProvider, RegisterForm, SessionError,
};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::sync::broadcast;
use url::Url;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{}", .0.user_message())]
    Session(#[from] SessionError),
    #[error(transparent)]
    OAuth(#[from] OAuthError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Blog auth client: log in, inspect the session, walk guarded routes")]
struct Cli {
    /// Where the credential cookie is persisted between runs.
    #[arg(long, env = "AUTHGATE_COOKIE_FILE", default_value = ".authgate/cookies.json")]
    cookie_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Email/password login.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTHGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: String,
        #[arg(long, env = "AUTHGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Fetch and print the current user's profile.
    Whoami,
    Logout,
    /// Print the provider authorization URL to open in a browser.
    OauthUrl { provider: OAuthProvider },
    /// Finish a redirect sign-in from the URL the provider sent you back to.
    OauthCallback { provider: OAuthProvider, callback_url: Url },
    /// Navigate through paths in order, running the auth guard.
    Visit { paths: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let credentials = CredentialStore::new(
        Arc::new(FileCookies::new(&cli.cookie_file)),
        config.credential_cookie_key.clone(),
    );
    let state = AppState::new(config, credentials)?;
    let mut signals = state.signals.subscribe();

    let result = run(&state, cli.command).await;
    print_signals(&mut signals);
    result
}

async fn run(state: &AppState, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login { email, password } => {
            let profile = state.session.login(&LoginForm { email, password }).await?;
            print_json(&profile.into_value())
        }
        Command::Register { username, email, password } => {
            let form = RegisterForm { user_name: username, email, password };
            let profile = state.session.register(&form).await?;
            print_json(&profile.into_value())
        }
        Command::Whoami => {
            if state.session.credential().is_none() {
                println!("not logged in");
                return Ok(());
            }
            match state.session.fetch_profile().await? {
                Some(profile) => print_json(&profile.into_value()),
                None => {
                    println!("no profile");
                    Ok(())
                }
            }
        }
        Command::Logout => {
            state.session.logout().await;
            println!("ok");
            Ok(())
        }
        Command::OauthUrl { provider } => {
            let url = state.redirect.authorization_url(provider).await?;
            println!("{url}");
            Ok(())
        }
        Command::OauthCallback { provider, callback_url } => {
            let profile = state.redirect.complete(provider, &callback_url).await?;
            print_json(&profile.into_value())
        }
        Command::Visit { paths } => {
            for path in paths {
                match state.router.navigate(&path).await {
                    NavigationOutcome::Arrived { route, redirected } => {
                        let name = route.name.as_deref().unwrap_or("-");
                        let note = if redirected { " (redirected)" } else { "" };
                        println!("{path} -> {} [{name}]{note}", route.path);
                    }
                    NavigationOutcome::Blocked => println!("{path} -> blocked"),
                }
            }
            if let Some(title) = state.router.title() {
                println!("title: {title}");
            }
            Ok(())
        }
    }
}

fn print_signals(rx: &mut broadcast::Receiver<Signal>) {
    for signal in drain(rx) {
        match signal {
            Signal::Notice(notice) => eprintln!("[{:?}] {}", notice.level, notice.message),
            other => eprintln!("[signal] {}", other.name()),
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

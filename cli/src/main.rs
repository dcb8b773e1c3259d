use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use foodgram::config::ClientConfig;
use foodgram::error::{ApiError, ConfigError, ErrorCode, SessionError};
use foodgram::guard::GuardDecision;
use foodgram::net::api::HttpBackend;
use foodgram::net::types::{ChangePasswordPayload, Credentials, RecipeId, SignUpPayload};
use foodgram::routes::{Route, menu};
use foodgram::session::{CheckoutOutcome, Session, SuggestionOutcome};
use foodgram::state::ai::SuggestionRejection;
use foodgram::state::auth::AuthStatus;
use foodgram::state::checkout::{CheckoutRejection, DeliveryService};
use foodgram::storage::FileTokenStore;
use serde_json::{Value, json};

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

type CliSession = Session<HttpBackend, FileTokenStore>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("checkout rejected: {0}")]
    Checkout(#[from] CheckoutRejection),
    #[error("suggestion rejected: {0}")]
    Suggestion(#[from] SuggestionRejection),
    #[error("not signed in; run `foodgram sign-in` first")]
    NotSignedIn,
    #[error("unknown route `{0}`")]
    UnknownRoute(String),
    #[error("io failed: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(err) => err.error_code(),
            Self::Api(err) => err.error_code(),
            Self::Session(err) => err.error_code(),
            Self::Checkout(_) => "E_CHECKOUT_REJECTED",
            Self::Suggestion(_) => "E_SUGGESTION_REJECTED",
            Self::NotSignedIn => "E_NOT_SIGNED_IN",
            Self::UnknownRoute(_) => "E_UNKNOWN_ROUTE",
            Self::Io(_) => "E_IO",
            Self::InvalidJson(_) => "E_JSON",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "foodgram", about = "Foodgram shopping-cart and checkout CLI")]
struct Cli {
    #[arg(long, env = "FOODGRAM_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "FOODGRAM_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show auth state, profile and cart count.
    Status,
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FOODGRAM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    SignOut,
    SignUp(SignUpArgs),
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long = "new")]
        new_password: String,
    },
    Cart(CartCommand),
    /// Buy everything in the cart through a delivery service.
    Checkout {
        #[arg(long, value_parser = parse_service, help = service_help())]
        service: DeliveryService,
        #[arg(long, short = 'y', default_value_t = false, help = "Skip the confirmation prompt")]
        yes: bool,
    },
    /// Ask for a recipe suggestion from free-text ingredients.
    Suggest {
        #[arg(required = true, num_args = 1..)]
        ingredients: Vec<String>,
    },
    DownloadList {
        #[arg(long, short = 'o', default_value = "shopping_list.txt")]
        output: PathBuf,
    },
    /// Resolve a path through the route guard.
    Route {
        path: String,
    },
    Menu,
}

#[derive(Args, Debug)]
struct SignUpArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long, env = "FOODGRAM_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct CartCommand {
    #[command(subcommand)]
    command: CartSubcommand,
}

#[derive(Subcommand, Debug)]
enum CartSubcommand {
    List,
    Add { recipe_id: RecipeId },
    Remove { recipe_id: RecipeId },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error[{}]: {err}", err.code());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    if let Some(token_path) = cli.token_path {
        config = config.with_token_path(token_path);
    }
    tracing::debug!(base_url = %config.base_url, "client configured");

    let backend = HttpBackend::from_config(&config)?;
    let session = Session::new(backend, FileTokenStore::new(config.token_path.clone()));
    session.bootstrap().await;

    let result = dispatch(&session, cli.command).await;
    flush_notices(&session);
    result
}

async fn dispatch(session: &CliSession, command: Command) -> Result<(), CliError> {
    match command {
        Command::Status => run_status(session),
        Command::SignIn { email, password } => {
            session.sign_in(&Credentials { email, password }).await?;
            run_status(session)
        }
        Command::SignOut => {
            session.sign_out().await?;
            println!("signed out");
            Ok(())
        }
        Command::SignUp(args) => {
            let payload = SignUpPayload {
                email: args.email,
                password: args.password,
                username: args.username,
                first_name: args.first_name,
                last_name: args.last_name,
            };
            session.sign_up(&payload).await?;
            println!("registered; sign in to continue");
            Ok(())
        }
        Command::ChangePassword { current, new_password } => {
            require_sign_in(session)?;
            let payload = ChangePasswordPayload { new_password, current_password: current };
            session.change_password(&payload).await?;
            println!("password changed");
            Ok(())
        }
        Command::Cart(cart) => run_cart(session, cart).await,
        Command::Checkout { service, yes } => run_checkout(session, service, yes).await,
        Command::Suggest { ingredients } => run_suggest(session, &ingredients.join(" ")).await,
        Command::DownloadList { output } => {
            require_sign_in(session)?;
            let bytes = session.download_shopping_list().await?;
            std::fs::write(&output, bytes)?;
            println!("{}", output.display());
            Ok(())
        }
        Command::Route { path } => {
            let route = Route::parse(&path).ok_or(CliError::UnknownRoute(path))?;
            println!("{}", describe_decision(&session.navigate(route)));
            Ok(())
        }
        Command::Menu => {
            for item in menu(session.auth_status()) {
                println!("{:<20} {}", item.title, item.href);
            }
            Ok(())
        }
    }
}

fn run_status(session: &CliSession) -> Result<(), CliError> {
    let status = match session.auth_status() {
        AuthStatus::Unknown => "unknown",
        AuthStatus::SignedOut => "signed-out",
        AuthStatus::SignedIn => "signed-in",
    };
    let body = json!({
        "status": status,
        "user": session.user(),
        "orders": session.order_count(),
    });
    print_json(&body)
}

async fn run_cart(session: &CliSession, cart: CartCommand) -> Result<(), CliError> {
    require_sign_in(session)?;
    match cart.command {
        CartSubcommand::List => {
            let recipes = session.load_cart().await?;
            print_json(&serde_json::to_value(recipes)?)
        }
        CartSubcommand::Add { recipe_id } => {
            let count = session.add_to_cart(recipe_id).await?;
            println!("orders: {count}");
            Ok(())
        }
        CartSubcommand::Remove { recipe_id } => {
            let count = session.remove_from_cart(recipe_id).await?;
            println!("orders: {count}");
            Ok(())
        }
    }
}

async fn run_checkout(session: &CliSession, service: DeliveryService, yes: bool) -> Result<(), CliError> {
    require_sign_in(session)?;
    session.select_delivery_service(service)?;
    let recipes = session.load_cart().await?;
    session.request_checkout()?;

    if !yes {
        for recipe in &recipes {
            eprintln!("  - {}", recipe.name);
        }
        eprint!("Confirm order of {} recipe(s) via {service}? [y/N] ", recipes.len());
        io::stderr().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if !is_affirmative(&answer) {
            session.cancel_checkout();
            println!("cancelled");
            return Ok(());
        }
    }

    match session.confirm_checkout().await? {
        CheckoutOutcome::Completed { order_uuid } => {
            print_json(&json!({ "success": true, "order_uuid": order_uuid, "orders": session.order_count() }))
        }
        CheckoutOutcome::Failed { reason } => print_json(&json!({ "success": false, "message": reason })),
    }
}

async fn run_suggest(session: &CliSession, ingredients: &str) -> Result<(), CliError> {
    session.set_ingredients(ingredients);
    match session.request_suggestion(ingredients).await? {
        SuggestionOutcome::Received(text) => println!("{text}"),
        SuggestionOutcome::Failed => eprintln!("suggestion unavailable; try again later"),
    }
    Ok(())
}

fn parse_service(raw: &str) -> Result<DeliveryService, CheckoutRejection> {
    raw.parse()
}

fn service_help() -> String {
    let values: Vec<&str> = DeliveryService::ALL.iter().map(|service| service.value()).collect();
    format!("Delivery service: {}", values.join(", "))
}

fn require_sign_in(session: &CliSession) -> Result<(), CliError> {
    if session.auth_status().is_signed_in() { Ok(()) } else { Err(CliError::NotSignedIn) }
}

fn flush_notices(session: &CliSession) {
    for notice in session.take_notices() {
        eprintln!("{}", notice.message);
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn describe_decision(decision: &GuardDecision) -> String {
    match decision {
        GuardDecision::Loading => "loading".to_owned(),
        GuardDecision::Render(route) => format!("render {route}"),
        GuardDecision::Redirect(route) => format!("redirect {route}"),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

//! Tider - appointment booking client
//!
//! Command-line frontend over the session, state, and booking layers.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tider_core::{decide, AppState, Database, Route, RouteDecision};
use tider_net::types::CreateProfileRequest;
use tider_net::ApiClient;

mod account;
mod booking;
mod config;

use account::AccountFlows;
use booking::{BookingSession, BookingState};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "tider", about = "Appointment booking client", version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "TIDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show session and profile status
    Status,
    /// Register a new account by email
    Register { email: String, password: String },
    /// Resend the verification email
    Resend { email: String },
    /// Redeem an email verification token
    Verify { token: String },
    /// Sign in
    Login { email: String, password: String },
    /// Sign out
    Logout,
    /// Create your profile
    CreateProfile {
        name: String,
        age: u32,
        #[arg(long)]
        profession: Option<String>,
    },
    /// Show your profile
    Profile,
    /// List bookable slots for a date (YYYY-MM-DD)
    Slots { date: NaiveDate },
    /// Book the Nth listed slot for a date
    Book { date: NaiveDate, index: usize },
    /// Show which views the current state can reach
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = Arc::new(Mutex::new(
        Database::open(&db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?,
    ));

    let state = Arc::new(AppState::new(db));
    let api = ApiClient::new(&config.api_url, Arc::new(state.session().clone()));

    match cli.command {
        Command::Status => status(&state),
        Command::Register { email, password } => {
            let flows = AccountFlows::new(api, state);
            let message = flows.register(&email, &password).await?;
            println!("{}", message);
        }
        Command::Resend { email } => {
            let flows = AccountFlows::new(api, state);
            let message = flows.resend_verification(&email).await?;
            println!("{}", message);
        }
        Command::Verify { token } => {
            let flows = AccountFlows::new(api, state);
            let message = flows.verify_email(&token).await?;
            println!("{}", message);
        }
        Command::Login { email, password } => {
            let flows = AccountFlows::new(api, state);
            if flows.login(&email, &password).await? {
                println!("Signed in");
            } else {
                println!("Server issued an already-expired token; not signed in");
            }
        }
        Command::Logout => {
            let flows = AccountFlows::new(api, state);
            flows.logout().await?;
            println!("Signed out");
        }
        Command::CreateProfile {
            name,
            age,
            profession,
        } => {
            require(&state, Route::ProfileCreate)?;
            let flows = AccountFlows::new(api, state);
            let req = CreateProfileRequest {
                name,
                age,
                profession,
                ..Default::default()
            };
            flows.create_profile(&req).await?;
            println!("Profile created");
        }
        Command::Profile => {
            require(&state, Route::ProfileView)?;
            let flows = AccountFlows::new(api, state);
            let profile = flows.load_profile().await?;
            println!("id:         {}", profile.id);
            println!("name:       {}", profile.name.as_deref().unwrap_or("-"));
            if let Some(age) = profile.age {
                println!("age:        {}", age);
            }
            println!(
                "profession: {}",
                profile.profession.as_deref().unwrap_or("-")
            );
        }
        Command::Slots { date } => {
            require(&state, Route::Booking)?;
            let session = BookingSession::new(api, state);
            session.pick_date(date).await?;
            print_slots(&session.state());
        }
        Command::Book { date, index } => {
            require(&state, Route::Booking)?;
            let session = BookingSession::new(api, state);
            session.pick_date(date).await?;

            let slot = match session.state() {
                BookingState::SlotsReady { slots, .. } => *slots
                    .get(index)
                    .with_context(|| format!("No slot at index {}", index))?,
                other => anyhow::bail!("Slots unavailable: {:?}", other),
            };

            session.choose_slot(slot)?;
            session.submit().await?;
            match session.state() {
                BookingState::Confirmed(booking) => {
                    println!("Booked {}", booking.slot.to_rfc3339());
                    println!("Confirmation: {}", booking.confirmation_id);
                }
                BookingState::Failed { reason } => {
                    anyhow::bail!("Booking failed: {}", reason);
                }
                other => anyhow::bail!("Booking did not complete: {:?}", other),
            }
        }
        Command::Routes => routes(&state),
    }

    Ok(())
}

/// Apply the route gate a graphical frontend would apply on navigation
fn require(state: &AppState, route: Route) -> anyhow::Result<()> {
    match decide(&state.snapshot(), route) {
        RouteDecision::Allow => Ok(()),
        RouteDecision::Redirect(Route::Login) => {
            anyhow::bail!("Not signed in; run `tider login` first")
        }
        RouteDecision::Redirect(Route::ProfileCreate) => {
            anyhow::bail!("No profile yet; run `tider create-profile` first")
        }
        RouteDecision::Redirect(other) => anyhow::bail!("Redirected to {:?}", other),
    }
}

fn status(state: &AppState) {
    let snap = state.snapshot();
    println!(
        "session:  {}",
        if snap.authenticated {
            "signed in"
        } else {
            "signed out"
        }
    );
    if let Some(name) = state.session().current_user_name() {
        println!("user:     {}", name);
    }
    println!(
        "profile:  {}",
        if snap.profile_created {
            "created"
        } else {
            "not created"
        }
    );
}

fn routes(state: &AppState) {
    let snap = state.snapshot();
    for route in [
        Route::Home,
        Route::Register,
        Route::VerifyEmail,
        Route::Login,
        Route::ProfileCreate,
        Route::ProfileView,
        Route::ProfileComplete,
        Route::Dashboard,
        Route::Booking,
    ] {
        match decide(&snap, route) {
            RouteDecision::Allow => println!("{:?}", route),
            RouteDecision::Redirect(to) => println!("{:?} -> {:?}", route, to),
        }
    }
}

fn print_slots(state: &BookingState) {
    match state {
        BookingState::SlotsReady {
            date,
            slots,
            degraded,
        } => {
            if *degraded {
                println!("Could not load slots for {}; try again", date);
            } else if slots.is_empty() {
                println!("No slots available on {}", date);
            } else {
                for (i, slot) in slots.iter().enumerate() {
                    println!("[{}] {}", i, slot.to_rfc3339());
                }
            }
        }
        other => println!("Slots unavailable: {:?}", other),
    }
}

mod auth;
mod backend;
mod config;
mod creator;
mod dashboard;
mod error;
mod guard;
mod logging;
mod models;
mod prompt;
mod session;
#[cfg(test)]
mod testing;
mod tui;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;

use auth::SignUpForm;
use backend::{Backend, SupabaseBackend};
use config::Config;
use creator::ApplicationForm;
use dashboard::Dashboard;
use guard::{Page, check_auth};
use logging::Verbosity;
use models::{Session, is_application_id};
use session::SessionStore;

#[derive(Parser)]
#[command(name = "jobdash")]
#[command(about = "Track your job applications from the terminal")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether you are signed in
    Status,

    /// Create an account
    Signup {
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,
    },

    /// Sign in with email and password, or with an OAuth provider
    Login {
        #[arg(long)]
        email: Option<String>,

        /// Sign in through the configured OAuth provider instead
        #[arg(long)]
        oauth: bool,
    },

    /// Sign out
    Logout {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Add a job application
    Add {
        #[arg(short, long)]
        company: Option<String>,

        /// Job title
        #[arg(short, long)]
        role: Option<String>,

        /// applied, interview, review, offer, rejected, archived
        #[arg(short, long, default_value = "applied")]
        status: String,

        /// Applied date as YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Where you found the job (LinkedIn, referral, ...)
        #[arg(short, long)]
        platform: Option<String>,

        /// low, medium, high
        #[arg(long)]
        priority: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Print the dashboard: counts and your ten most recent applications
    List,

    /// Browse the dashboard interactively
    Dashboard,

    /// Delete an application
    Delete {
        /// Application ID (shown by `jobdash list`)
        id: String,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the resolved configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(Verbosity::from_flags(cli.verbose, cli.quiet));

    let config = Config::load_from(cli.config.clone()).context("Failed to load configuration")?;
    let command = cli.command.unwrap_or(Commands::Status);

    if let Commands::Config = command {
        print_config(&config, cli.config.as_ref());
        return Ok(());
    }

    let backend = SupabaseBackend::new(&config.backend, SessionStore::new(config.session_path()))?;

    match command {
        Commands::Status => {
            let guard = check_auth(&backend, Page::Index);
            print_index(guard.session.as_ref());
        }

        Commands::Signup {
            email,
            first_name,
            last_name,
        } => {
            let Entry::Proceed(_) = enter(&backend, Page::Signup)? else {
                return Ok(());
            };
            let form = SignUpForm {
                first_name: value_or_prompt(first_name, "First name")?,
                last_name: value_or_prompt(last_name, "Last name")?,
                email: value_or_prompt(email, "Email")?,
                password: prompt::read_password("Password")?,
                confirm_password: prompt::read_password("Confirm password")?,
            };
            match auth::sign_up(&backend, form)? {
                Some(session) => {
                    println!("Account created successfully! Redirecting to dashboard...\n");
                    print_dashboard(&backend, &session);
                }
                None => {
                    println!("Account created! Confirm your email address, then run `jobdash login`.");
                }
            }
        }

        Commands::Login { email, oauth } => {
            let Entry::Proceed(_) = enter(&backend, Page::Login)? else {
                return Ok(());
            };
            let session = if oauth {
                let url = auth::oauth_url(&backend, &config.auth)?;
                println!("Open this URL in your browser and sign in:\n\n  {url}\n");
                let redirect =
                    prompt::read_line("Paste the address your browser was redirected to")?;
                auth::complete_oauth(&backend, &redirect)?
            } else {
                let email = value_or_prompt(email, "Email")?;
                let password = prompt::read_password("Password")?;
                auth::sign_in(&backend, &email, &password)?
            };
            print_dashboard(&backend, &session);
        }

        Commands::Logout { yes } => {
            let guard = check_auth(&backend, Page::Index);
            if guard.session.is_none() {
                println!("Not signed in.");
                return Ok(());
            }
            if !yes && !prompt::confirm("Do you want to logout?")? {
                return Ok(());
            }
            auth::sign_out(&backend).map_err(|e| anyhow!("Error logging out: {e}"))?;
            print_index(None);
        }

        Commands::Add {
            company,
            role,
            status,
            date,
            platform,
            priority,
            notes,
        } => {
            let Entry::Proceed(Some(session)) = enter(&backend, Page::AddJob)? else {
                return Ok(());
            };
            let form = ApplicationForm {
                company: value_or_prompt(company, "Company")?,
                role: value_or_prompt(role, "Job title")?,
                platform,
                applied_date: date
                    .unwrap_or_else(|| chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()),
                status,
                priority,
                notes,
            };
            match creator::submit(&backend, &session, form) {
                Ok(app) => {
                    println!("Job application added successfully! ({})\n", app.id);
                    print_dashboard(&backend, &session);
                }
                Err(error::Error::Backend(e)) => bail!("Error adding job application: {e}"),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::List => {
            let Entry::Proceed(Some(session)) = enter(&backend, Page::Dashboard)? else {
                return Ok(());
            };
            print_dashboard(&backend, &session);
        }

        Commands::Dashboard => {
            let Entry::Proceed(Some(session)) = enter(&backend, Page::Dashboard)? else {
                return Ok(());
            };
            let dashboard = Dashboard::load(&backend, &session.user);
            tui::run_dashboard(dashboard, &backend)?;
        }

        Commands::Delete { id, yes } => {
            let Entry::Proceed(Some(session)) = enter(&backend, Page::Dashboard)? else {
                return Ok(());
            };
            let mut dashboard = Dashboard::load(&backend, &session.user);
            let Some(app) = dashboard.get(&id) else {
                if is_application_id(&id) {
                    bail!("Application {} not found", id);
                }
                bail!("'{}' is not one of your application IDs (see `jobdash list`)", id);
            };
            println!("{} at {}", app.role, app.company);
            if !yes && !prompt::confirm("Are you sure you want to delete this application?")? {
                return Ok(());
            }
            dashboard
                .delete(&backend, &id)
                .map_err(|e| anyhow!("Error deleting application: {e}"))?;
            println!("Application deleted successfully\n");
            print!("{}", dashboard::render_text(&dashboard.view()));
        }

        Commands::Config => print_config(&config, cli.config.as_ref()),
    }

    Ok(())
}

/// What the auth guard decided for a command.
enum Entry {
    /// Go ahead. Protected pages always carry a session here.
    Proceed(Option<Session>),
    /// The guard sent the user elsewhere and that page has been shown.
    Redirected,
}

fn enter(backend: &dyn Backend, page: Page) -> Result<Entry> {
    let guard = check_auth(backend, page);
    match (guard.redirect, guard.session) {
        (Some(Page::Login), _) => bail!(
            "You are not signed in. Run `{}` first.",
            Page::Login.command()
        ),
        (Some(Page::Dashboard), Some(session)) => {
            println!(
                "Already signed in as {}.\n",
                session.user.email.as_deref().unwrap_or(&session.user.id)
            );
            print_dashboard(backend, &session);
            Ok(Entry::Redirected)
        }
        (Some(other), _) => bail!("Cannot open {other} from here"),
        (None, session) => Ok(Entry::Proceed(session)),
    }
}

fn print_dashboard(backend: &dyn Backend, session: &Session) {
    let dashboard = Dashboard::load(backend, &session.user);
    print!("{}", dashboard::render_text(&dashboard.view()));
}

fn print_index(session: Option<&Session>) {
    println!("jobdash - track every application in one place\n");
    match session {
        Some(session) => {
            println!("Signed in as {}.", session.user.display_name());
            println!("  jobdash list        show your dashboard");
            println!("  jobdash add         track a new application");
            println!("  jobdash logout      sign out");
        }
        None => {
            println!("Not signed in.");
            println!("  jobdash login       sign in");
            println!("  jobdash signup      create an account");
        }
    }
}

fn print_config(config: &Config, path: Option<&PathBuf>) {
    let path = path.cloned().unwrap_or_else(Config::default_config_path);
    println!("Config file:   {}", path.display());
    println!("Session file:  {}", config.session_path().display());
    println!(
        "Backend URL:   {}",
        if config.backend.url.is_empty() {
            "(not set)"
        } else {
            config.backend.url.as_str()
        }
    );
    println!("Anon key:      {}", config.backend.masked_key());
    println!("Table:         {}", config.backend.table);
    println!("Timeout:       {}s", config.backend.timeout_secs);
    println!("OAuth:         {}", config.auth.oauth_provider);
    if let Some(redirect) = &config.auth.redirect_to {
        println!("Redirect to:   {redirect}");
    }
}

/// Use the flag value when given, otherwise ask on the terminal.
fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None if std::io::stdin().is_terminal() => prompt::read_line(label),
        None => Ok(String::new()),
    }
}

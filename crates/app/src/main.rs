use std::fmt;

use studyunit_core::Clock;
use studyunit_core::model::AppState;
use studyunit_services::{AppServices, DEFAULT_DEBOUNCE};
use studyunit_storage::{AuthSession, RestConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    MissingBackend,
    MissingCredentials,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingBackend => {
                write!(f, "backend url and api key are required (flags or env)")
            }
            ArgsError::MissingCredentials => {
                write!(f, "email and password are required (flags or env)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Sync,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "sync" => Some(Self::Sync),
            _ => None,
        }
    }
}

struct Args {
    backend: RestConfig,
    email: String,
    password: String,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p studyunit-app -- status [options]");
    eprintln!("  cargo run -p studyunit-app -- sync   [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --backend-url <url>   hosted backend base url");
    eprintln!("  --api-key <key>       hosted backend anon key");
    eprintln!("  --bucket <name>       object store bucket (default app-files)");
    eprintln!("  --email <email>       account email");
    eprintln!("  --password <pw>       account password");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDYUNIT_BACKEND_URL, STUDYUNIT_BACKEND_KEY, STUDYUNIT_BACKEND_BUCKET");
    eprintln!("  STUDYUNIT_EMAIL, STUDYUNIT_PASSWORD");
    eprintln!("  STUDYUNIT_AI_API_KEY, STUDYUNIT_AI_BASE_URL, STUDYUNIT_AI_MODEL");
    eprintln!("  STUDYUNIT_LOG (tracing filter, default info)");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut backend_url = std::env::var("STUDYUNIT_BACKEND_URL").ok();
        let mut api_key = std::env::var("STUDYUNIT_BACKEND_KEY").ok();
        let mut bucket = std::env::var("STUDYUNIT_BACKEND_BUCKET").ok();
        let mut email = std::env::var("STUDYUNIT_EMAIL").ok();
        let mut password = std::env::var("STUDYUNIT_PASSWORD").ok();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--backend-url" => backend_url = Some(require_value(args, "--backend-url")?),
                "--api-key" => api_key = Some(require_value(args, "--api-key")?),
                "--bucket" => bucket = Some(require_value(args, "--bucket")?),
                "--email" => email = Some(require_value(args, "--email")?),
                "--password" => password = Some(require_value(args, "--password")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let (Some(backend_url), Some(api_key)) = (backend_url, api_key) else {
            return Err(ArgsError::MissingBackend);
        };
        if backend_url.trim().is_empty() || api_key.trim().is_empty() {
            return Err(ArgsError::MissingBackend);
        }
        let (Some(email), Some(password)) = (email, password) else {
            return Err(ArgsError::MissingCredentials);
        };

        let mut backend = RestConfig::new(backend_url, api_key);
        if let Some(bucket) = bucket {
            backend = backend.with_bucket(bucket);
        }
        Ok(Self {
            backend,
            email,
            password,
        })
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("STUDYUNIT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Status,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Status,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = Clock::default_clock();
    let services = AppServices::hosted(clock, parsed.backend);

    let session = services
        .auth()
        .sign_in(&parsed.email, &parsed.password)
        .await?;
    let state = services.auth().load_state(&session.user_id).await?;

    match cmd {
        Command::Status => {
            print_dashboard(&clock, &session, &state);
            Ok(())
        }
        Command::Sync => {
            let sync = services.spawn_sync(session.user_id.clone(), DEFAULT_DEBOUNCE);
            sync.schedule(state.document());
            sync.close().await;
            println!("State synced for {}.", session.salutation());
            Ok(())
        }
    }
}

fn print_dashboard(clock: &Clock, session: &AuthSession, state: &AppState) {
    println!("Hello, {}!", session.salutation());
    println!();
    println!("Tier: {}", state.tier);
    println!(
        "Streak: {} day(s) (longest {})",
        state.stats.current_streak, state.stats.longest_streak
    );
    println!(
        "Today: {}/{} questions ({:.0}%)",
        state.stats.questions_today,
        state.stats.daily_goal,
        state.stats.daily_progress() * 100.0
    );
    let days_left = (state.exam_date - clock.today()).num_days();
    println!("Exam: {} ({days_left} day(s) away)", state.exam_date);

    println!();
    println!(
        "Materials ({}/{}):",
        state.materials.len(),
        state.tier.entitlements().material_limit
    );
    for material in &state.materials {
        let marker = if material.processed() { "*" } else { " " };
        let kind = material.kind().as_str();
        let selected = if state.is_selected(material.id()) {
            " [selected]"
        } else {
            ""
        };
        println!("  {marker} {} ({kind}){selected}", material.name());
    }

    if let Some(day) = state.plan.first() {
        println!();
        println!(
            "Today's plan ({} min, {}):",
            day.duration_minutes(),
            day.date()
        );
        for (task, done) in day.tasks().iter().zip(day.task_status()) {
            let check = if *done { "x" } else { " " };
            println!("  [{check}] {task}");
        }
    }

    if !state.weak_spots.is_empty() {
        println!();
        println!("Weak spots:");
        let mut spots: Vec<_> = state.weak_spots.iter().collect();
        spots.sort_by(|a, b| b.1.cmp(a.1));
        for (topic, misses) in spots.into_iter().take(5) {
            println!("  {topic}: missed {misses}x");
        }
    }

    if let Some(progress) = &state.current_quiz {
        println!();
        println!(
            "Resumable quiz: question {}/{} (score {})",
            progress.current_index + 1,
            progress.total_questions(),
            progress.score
        );
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(%err, "fatal");
        std::process::exit(1);
    }
}

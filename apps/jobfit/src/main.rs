use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobfit::analysis::{
    display_recommendations, AnalysisWorkflow, DraftInput, SubmitOutcome, UploadFile,
};
use jobfit::assistant::AskOutcome;
use jobfit::config::Config;
use jobfit::errors::AppError;
use jobfit::models::Role;
use jobfit::state::AppState;

#[derive(Parser)]
#[command(name = "jobfit")]
#[command(about = "Score a resume against a job description")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Account email (falls back to JOBFIT_EMAIL)
    #[arg(long, global = true)]
    email: Option<String>,

    /// Account password (falls back to JOBFIT_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Check the credentials against the scoring service
    Login,
    /// Create an account
    Signup,
    /// Analyze a resume against a job description
    Analyze {
        /// Resume file path, or the resume text itself
        #[arg(long)]
        resume: String,
        /// Job description file path, or the text itself
        #[arg(long)]
        job: String,
        /// Question for the assistant once the report is ready (repeatable)
        #[arg(long = "ask")]
        questions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("jobfit v{} using {}", env!("CARGO_PKG_VERSION"), config.api_url);

    let cli = Cli::parse();
    let email = cli.email.or_else(|| config.email.clone());
    let password = cli.password.or_else(|| config.password.clone());
    let state = AppState::from_config(config)?;

    run(&state, cli.command, email, password)
        .await
        .map_err(|e| anyhow!(e.user_message()))
}

async fn run(
    state: &AppState,
    command: Command,
    email: Option<String>,
    password: Option<String>,
) -> Result<(), AppError> {
    let (email, password) = credentials(email, password)?;
    let auth = state.authenticator();

    match command {
        Command::Login => {
            auth.login(&email, &password).await?;
            println!("Signed in as {}", email.trim());
        }
        Command::Signup => {
            auth.signup(&email, &password).await?;
            println!("Account created for {}", email.trim());
        }
        Command::Analyze {
            resume,
            job,
            questions,
        } => {
            auth.login(&email, &password).await?;
            let workflow = state.workflow();
            analyze(&workflow, &resume, &job).await?;
            converse(&workflow, &questions).await?;
        }
    }
    Ok(())
}

fn credentials(
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String), AppError> {
    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(AppError::Validation(
            "Email and password are required (--email/--password or JOBFIT_EMAIL/JOBFIT_PASSWORD)"
                .to_string(),
        )),
    }
}

async fn analyze(workflow: &AnalysisWorkflow, resume: &str, job: &str) -> Result<(), AppError> {
    workflow.set_resume(draft_input(resume).await?)?;
    workflow.advance()?;
    workflow.set_job_description(draft_input(job).await?)?;

    let report = match workflow.submit().await? {
        SubmitOutcome::Completed(report) => report,
        SubmitOutcome::Suppressed => {
            return Err(AppError::Internal(anyhow!("analysis already in progress")))
        }
    };

    println!("{report}");
    let recommendations = display_recommendations(&report);
    if !recommendations.is_empty() {
        println!("\nRecommendations:");
        for line in recommendations {
            println!("  - {line}");
        }
    }
    Ok(())
}

async fn converse(workflow: &AnalysisWorkflow, questions: &[String]) -> Result<(), AppError> {
    if questions.is_empty() {
        return Ok(());
    }
    for question in questions {
        if let AskOutcome::Ignored = workflow.assistant().ask(question).await? {
            info!("Skipping blank question");
        }
    }

    println!("\nAssistant:");
    for turn in workflow.assistant().turns() {
        let speaker = match turn.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("  {speaker}: {}", turn.text);
    }
    Ok(())
}

/// An argument naming an existing file is uploaded as that file; anything
/// else is taken as pasted text.
async fn draft_input(arg: &str) -> Result<DraftInput, AppError> {
    let path = PathBuf::from(arg);
    if is_file(&path).await {
        Ok(DraftInput::File(UploadFile::from_path(&path).await?))
    } else {
        Ok(DraftInput::text(arg))
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

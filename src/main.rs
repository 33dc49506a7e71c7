use std::{path::PathBuf, sync::Arc};

use brainbell::{
    app_state::AppState,
    auth::{IdentityProvider, TokenIdentityProvider},
    config::Config,
    errors::{AppError, AppResult, ErrorResponse},
    models::{
        domain::{Identity, Question},
        dto::request::CreateTestRequest,
    },
    services::{parse_generated_survey, AttemptHandle, AttemptOutcome, AttemptRunner, AttemptUpdate},
};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Parser, Debug)]
#[command(version, about = "Timed tests and surveys", long_about = None)]
struct Cli {
    /// Identity token; enables the one-attempt-per-participant check
    #[arg(long, global = true, env = "BRAINBELL_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Take a test in the terminal
    Attend {
        test_id: String,
        /// Name to record with the result
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Create a test from a JSON file
    CreateTest { file: PathBuf },
    /// List the tests you created
    MyTests,
    /// List the tests you have taken, with scores
    MyAttempts,
    /// Show results of a test you created
    Results { test_id: String },
    /// Store a survey from generator output
    ImportSurvey { file: PathBuf },
    /// Show per-option tallies of a survey
    SurveyStats { survey_id: String },
    /// Issue an identity token signed with the configured secret
    IssueToken {
        #[arg(long)]
        key: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env();

    if let Err(err) = run(cli, config).await {
        if err.is_recoverable() {
            log::warn!("{}", err);
        } else {
            log::error!("{}", err);
        }
        match serde_json::to_string(&ErrorResponse::from(&err)) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: Config) -> AppResult<()> {
    let state = AppState::new(config).await?;

    let identity = match cli.token.as_deref() {
        Some(token) => Some(TokenIdentityProvider::from_token(&state.jwt_service, token)?),
        None => None,
    };

    match cli.command {
        Command::Attend { test_id, name } => {
            let provider = identity.map(|p| Arc::new(p) as Arc<dyn IdentityProvider>);
            attend(&state, &test_id, name, provider).await
        }
        Command::CreateTest { file } => {
            let owner = require_identity(identity)?;
            let request: CreateTestRequest = serde_json::from_str(&read_file(&file).await?)?;
            let test = state.test_service.create_test(&owner, request).await?;
            println!("Created test '{}' ({})", test.title, test.id);
            Ok(())
        }
        Command::MyTests => {
            let owner = require_identity(identity)?;
            for test in state.test_service.list_tests_by_owner(&owner).await? {
                println!(
                    "{}  {}  ({} questions)",
                    test.id,
                    test.title,
                    test.questions.len()
                );
            }
            Ok(())
        }
        Command::MyAttempts => {
            let participant = require_identity(identity)?;
            let attended = state
                .test_service
                .list_attempts_by_participant(&participant)
                .await?;
            if attended.is_empty() {
                println!("No test attempts found.");
            }
            for attempt in attended {
                println!(
                    "{}  {}  score {}/{}",
                    attempt.test_id, attempt.title, attempt.score, attempt.total
                );
            }
            Ok(())
        }
        Command::Results { test_id } => {
            let owner = require_identity(identity)?;
            let results = state.test_service.list_results(&owner, &test_id).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Command::ImportSurvey { file } => {
            let owner = require_identity(identity)?;
            let generated = parse_generated_survey(&read_file(&file).await?)?;
            let survey = state.survey_service.create_survey(&owner, generated).await?;
            println!("Created survey '{}' ({})", survey.title, survey.id);
            Ok(())
        }
        Command::SurveyStats { survey_id } => {
            let stats = state.survey_service.option_stats(&survey_id).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::IssueToken { key, name, email } => {
            let token = state
                .jwt_service
                .create_token(&Identity::new(&key, &name), &email)?;
            println!("{}", token);
            Ok(())
        }
    }
}

fn require_identity(provider: Option<TokenIdentityProvider>) -> AppResult<Identity> {
    provider
        .and_then(|p| p.current_identity())
        .ok_or_else(|| AppError::Unauthorized("this command needs --token".to_string()))
}

async fn read_file(path: &PathBuf) -> AppResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::ValidationError(format!("cannot read {}: {}", path.display(), e)))
}

async fn attend(
    state: &AppState,
    test_id: &str,
    name: Option<String>,
    identity: Option<Arc<dyn IdentityProvider>>,
) -> AppResult<()> {
    let signed_in = identity.as_ref().and_then(|p| p.current_identity());
    let controller = Arc::new(state.attempt_controller(identity));
    let session = controller.open(test_id).await?;

    println!("{}", session.definition().title);
    if !session.definition().description.is_empty() {
        println!("{}", session.definition().description);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let label = match preset_label(name, signed_in) {
        Some(label) => label,
        None => prompt_name(&mut lines).await?,
    };

    let (runner, handle, mut updates) = AttemptRunner::new(controller, session);
    let runner = tokio::spawn(runner.run());
    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            render(&update);
        }
    });

    handle.start(&label)?;
    let input = tokio::spawn(read_commands(lines, handle));

    let outcome = runner
        .await
        .map_err(|e| AppError::InternalError(format!("attempt task failed: {}", e)))?;
    input.abort();
    let _ = printer.await;

    match outcome {
        AttemptOutcome::Submitted(record) => {
            println!(
                "Thank you, {}! Your score is {}/{}",
                record.participant_label, record.score, record.total
            );
            Ok(())
        }
        AttemptOutcome::Unsaved { record, error } => {
            println!(
                "Your score was {}/{} but it could not be saved.",
                record.score, record.total
            );
            Err(AppError::StoreWriteFailure(error))
        }
        AttemptOutcome::AlreadyAttempted(_) => Err(AppError::AlreadyAttempted(format!(
            "you have already taken test '{}'",
            test_id
        ))),
        AttemptOutcome::Abandoned => {
            println!("Attempt abandoned; nothing was recorded.");
            Ok(())
        }
    }
}

/// A name given up front, else the signed-in display label. Blank values
/// count as absent so the participant is prompted instead.
fn preset_label(name: Option<String>, signed_in: Option<Identity>) -> Option<String> {
    name.into_iter()
        .chain(signed_in.map(|i| i.display_label))
        .map(|label| label.trim().to_string())
        .find(|label| !label.is_empty())
}

async fn prompt_name(lines: &mut Lines<BufReader<Stdin>>) -> AppResult<String> {
    loop {
        println!("Enter your name:");
        let line = lines
            .next_line()
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?
            .ok_or_else(|| AppError::ValidationError("no name given".to_string()))?;
        if !line.trim().is_empty() {
            return Ok(line.trim().to_string());
        }
    }
}

/// `<question> <option>` answers (1-based), `submit`, `retry`, `quit`.
async fn read_commands(mut lines: Lines<BufReader<Stdin>>, handle: AttemptHandle) {
    while let Ok(Some(line)) = lines.next_line().await {
        let words: Vec<&str> = line.split_whitespace().collect();
        let sent = match words.as_slice() {
            ["submit"] => handle.submit(),
            ["retry"] => handle.retry(),
            ["quit"] => handle.abandon(),
            [question, option] => match (question.parse::<usize>(), option.parse::<usize>()) {
                (Ok(q), Ok(o)) if q > 0 && o > 0 => handle.answer(q - 1, o - 1),
                _ => {
                    println!("Type '<question> <option>', 'submit', 'retry' or 'quit'");
                    Ok(())
                }
            },
            [] => Ok(()),
            _ => {
                println!("Type '<question> <option>', 'submit', 'retry' or 'quit'");
                Ok(())
            }
        };
        if sent.is_err() {
            break;
        }
    }
}

fn render(update: &AttemptUpdate) {
    match update {
        AttemptUpdate::Started {
            questions,
            remaining_seconds,
        } => {
            println!(
                "{} questions, {} minute(s). Answer with '<question> <option>'.",
                questions.len(),
                remaining_seconds / 60
            );
            for (position, question) in questions.iter().enumerate() {
                print_question(position, question);
            }
        }
        AttemptUpdate::Remaining {
            remaining_seconds,
            display,
        } => {
            if remaining_seconds % 60 == 0 || *remaining_seconds <= 10 {
                println!("Time left: {}", display);
            }
        }
        AttemptUpdate::Answered { position, option } => {
            println!("Q{}: option {} recorded", position + 1, option + 1);
        }
        AttemptUpdate::Submitted(_) => println!("Test submitted."),
        AttemptUpdate::SubmitFailed(error) => {
            println!("{} (type 'retry' to try again)", error);
        }
        AttemptUpdate::Rejected(reason) => println!("{}", reason),
    }
}

fn print_question(position: usize, question: &Question) {
    println!("Q{}: {}", position + 1, question.text);
    for (i, option) in question.options.iter().enumerate() {
        println!("   {}. {}", i + 1, option);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_falls_through_to_prompt() {
        assert_eq!(preset_label(Some("   ".to_string()), None), None);
        assert_eq!(preset_label(None, None), None);
    }

    #[test]
    fn blank_name_uses_signed_in_label() {
        let signed_in = Identity::new("u1", "Una");
        assert_eq!(
            preset_label(Some(" ".to_string()), Some(signed_in)),
            Some("Una".to_string())
        );
    }

    #[test]
    fn given_name_is_trimmed() {
        assert_eq!(
            preset_label(Some("  Alice ".to_string()), Some(Identity::new("u1", "Una"))),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn my_attempts_subcommand_parses() {
        let cli = Cli::try_parse_from(["brainbell", "--token", "abc", "my-attempts"]).unwrap();
        assert!(matches!(cli.command, Command::MyAttempts));
        assert_eq!(cli.token.as_deref(), Some("abc"));
    }
}

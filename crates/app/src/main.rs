mod demo;
mod logging;
mod terminal;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use gateway::{
    ApiConfig, Gateway, GatewayError, SessionIdentity, StaticIdentity, StoredIdentity,
};
use logisim_core::model::{AccountId, QuizId};
use services::{
    Clock, ExamCommand, ExamConfig, ExamRunner, ExamService, ExamSession, SessionError,
    TokioScheduler,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::terminal::{ConfirmRequest, Input, TerminalConfirmation};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidAccountId { raw: String },
    InvalidApiUrl { raw: String },
    MissingQuiz,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz value: {raw:?}"),
            ArgsError::InvalidAccountId { raw } => write!(f, "invalid --account value: {raw:?}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw:?}"),
            ArgsError::MissingQuiz => write!(f, "--quiz is required (or set LOGISIM_QUIZ_ID)"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  logisim-exam take [--quiz <id>] [--api <url>] [--session-file <path>]");
    eprintln!("                    [-v] [--quiet]");
    eprintln!("  logisim-exam demo [--account <id>] [-v] [--quiet]   (or: take --demo)");
    eprintln!();
    eprintln!("Defaults for take:");
    eprintln!("  --api http://localhost:8080/api");
    eprintln!("  --session-file session.json");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LOGISIM_QUIZ_ID, LOGISIM_API_BASE_URL, LOGISIM_ACCESS_TOKEN");
    eprintln!("  LOGISIM_SESSION_FILE");
    eprintln!("  LOGISIM_EXAM_DURATION_SECS, LOGISIM_TICK_MILLIS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    quiz_id: Option<QuizId>,
    api_url: Option<String>,
    session_file: PathBuf,
    account: AccountId,
    demo: bool,
    verbose: u8,
    quiet: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            quiz_id: std::env::var("LOGISIM_QUIZ_ID")
                .ok()
                .and_then(|raw| raw.parse().ok()),
            api_url: None,
            session_file: std::env::var("LOGISIM_SESSION_FILE")
                .map_or_else(|_| PathBuf::from("session.json"), PathBuf::from),
            account: AccountId::new("demo-student"),
            demo: false,
            verbose: 0,
            quiet: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiz" => {
                    let value = require_value(args, "--quiz")?;
                    let id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    parsed.quiz_id = Some(id);
                }
                "--api" => {
                    let value = require_value(args, "--api")?;
                    if !(value.starts_with("http://") || value.starts_with("https://")) {
                        return Err(ArgsError::InvalidApiUrl { raw: value });
                    }
                    parsed.api_url = Some(value);
                }
                "--session-file" => {
                    parsed.session_file = PathBuf::from(require_value(args, "--session-file")?);
                }
                "--account" => {
                    let value = require_value(args, "--account")?;
                    parsed.account = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAccountId { raw: value.clone() })?;
                }
                "--demo" => parsed.demo = true,
                "-v" | "--verbose" => parsed.verbose = parsed.verbose.saturating_add(1),
                "-vv" => parsed.verbose = parsed.verbose.saturating_add(2),
                "-q" | "--quiet" => parsed.quiet = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

/// Everything the runner needs, wired for either the backend or the offline demo.
struct Wiring {
    quiz_id: QuizId,
    gateway: Gateway,
    identity: Arc<dyn SessionIdentity>,
}

fn wire(cmd: Command, args: &Args) -> Result<Wiring, Box<dyn std::error::Error>> {
    match cmd {
        Command::Demo => {
            let repo = demo::demo_gateway()?;
            Ok(Wiring {
                quiz_id: QuizId::new(demo::DEMO_QUIZ_ID),
                gateway: Gateway::in_memory(repo),
                identity: Arc::new(StaticIdentity::signed_in(args.account.clone())),
            })
        }
        Command::Take => {
            let quiz_id = args.quiz_id.clone().ok_or(ArgsError::MissingQuiz)?;
            let identity = StoredIdentity::new(&args.session_file);

            let mut config = ApiConfig::from_env().with_access_token(identity.access_token());
            if let Some(url) = &args.api_url {
                config.base_url.clone_from(url);
            }
            log::info!("using backend at {}", config.base_url);

            Ok(Wiring {
                quiz_id,
                gateway: Gateway::http(config)?,
                identity: Arc::new(identity),
            })
        }
    }
}

fn print_result(session: &ExamSession) {
    match session.result() {
        Some(result) => println!(
            "Final score: {:.1}% ({}/{} correct)",
            result.percentage(),
            result.total_correct,
            result.total_questions
        ),
        None => println!("Left without submitting."),
    }
}

/// Drive one exam from the terminal until the student quits or stdin closes.
async fn take_exam(wiring: Wiring) -> Result<ExamSession, Box<dyn std::error::Error>> {
    let (confirm_tx, mut confirms) = mpsc::unbounded_channel::<ConfirmRequest>();
    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let (commands, command_rx) = mpsc::unbounded_channel();

    let service = ExamService::new(
        Clock::system(),
        wiring.gateway.quizzes,
        wiring.gateway.submissions,
        wiring.identity,
    )
    .with_config(ExamConfig::from_env())
    .with_confirmation(Arc::new(TerminalConfirmation::new(confirm_tx)));

    let runner = ExamRunner::new(Arc::new(service), Arc::new(TokioScheduler), notice_tx);
    let mut task = tokio::spawn(runner.run(wiring.quiz_id, command_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut awaiting: Option<ConfirmRequest> = None;
    let mut stdin_open = true;

    loop {
        tokio::select! {
            joined = &mut task => {
                while let Ok(notice) = notices.try_recv() {
                    if let Some(text) = terminal::render_notice(&notice) {
                        println!("{text}");
                    }
                }
                return Ok(joined??);
            }
            Some(request) = confirms.recv() => {
                println!("{}", request.prompt);
                awaiting = Some(request);
            }
            Some(notice) = notices.recv() => {
                if let Some(text) = terminal::render_notice(&notice) {
                    println!("{text}");
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // EOF: answer any open prompt with "no" and leave.
                    stdin_open = false;
                    if let Some(request) = awaiting.take() {
                        let _ = request.reply.send(false);
                    }
                    let _ = commands.send(ExamCommand::Quit);
                    continue;
                };

                if let Some(request) = awaiting.take() {
                    let _ = request.reply.send(terminal::is_yes(&line));
                    continue;
                }

                match terminal::parse_input(&line) {
                    Ok(Input::Command(command)) => {
                        let _ = commands.send(command);
                    }
                    Ok(Input::Help) => println!("{}", terminal::HELP),
                    Ok(Input::Empty) => {}
                    Err(message) => println!("{message}"),
                }
            }
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with('-') => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.to_string())
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with('-') {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    logging::init_logging(parsed.verbose, parsed.quiet);

    let cmd = if parsed.demo { Command::Demo } else { cmd };
    let wiring = wire(cmd, &parsed)?;
    println!("{}", terminal::HELP);

    match take_exam(wiring).await {
        Ok(session) => {
            print_result(&session);
            Ok(())
        }
        Err(err) => {
            if let Some(SessionError::Load(GatewayError::NotFound)) =
                err.downcast_ref::<SessionError>()
            {
                eprintln!("quiz not found");
            }
            Err(err)
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

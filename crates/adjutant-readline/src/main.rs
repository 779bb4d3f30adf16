use std::borrow::Cow::{self, Borrowed, Owned};
use std::fs;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use adjutant_core::message::{ConversationMessage, MessageRole};
use adjutant_core::{Session, UploadedFileRef};
use adjutant_interaction::config::ApiConfig;
use adjutant_interaction::orchestrator::{PollPolicy, RunOrchestrator};
use adjutant_interaction::resources::{AssistantsClient, CreateAssistant, Tool};
use adjutant_interaction::transport::HttpTransport;

/// Adjutant - chat with a configurable remote assistant from the terminal.
#[derive(Parser)]
#[command(name = "adjutant")]
#[command(about = "A terminal client for the OpenAI Assistants API", long_about = None)]
struct Cli {
    /// Model to use when the setup prompt is left empty
    #[arg(long)]
    model: Option<String>,
    /// Maximum number of run-status checks per turn (default: 120)
    #[arg(long, default_value_t = 120)]
    max_polls: u32,
}

/// CLI helper for rustyline that provides completion, highlighting, and hints
/// for the slash commands.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/upload".to_string(),
                "/files".to_string(),
                "/history".to_string(),
                "/new".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

type Repl = Editor<CliHelper, rustyline::history::DefaultHistory>;

fn prompt(rl: &mut Repl, label: &str) -> Result<String> {
    let line = rl.readline(&format!("{}: ", label))?;
    Ok(line.trim().to_string())
}

fn prompt_yes_no(rl: &mut Repl, label: &str) -> Result<bool> {
    let answer = prompt(rl, &format!("{} (y/n)", label))?;
    Ok(matches!(answer.as_str(), "y" | "Y" | "yes"))
}

/// Interactive setup: collect the assistant configuration, then create the
/// assistant and its conversation thread.
async fn setup(
    orchestrator: &RunOrchestrator<HttpTransport>,
    config: &ApiConfig,
    rl: &mut Repl,
    session: &mut Session,
) -> Result<()> {
    println!("{}", "--- Assistant setup ---".bright_magenta());

    let name = prompt(rl, "Assistant name")?;
    let model = prompt(rl, &format!("Model [{}]", config.default_model))?;
    let instructions = prompt(rl, "Instructions")?;

    let mut tools = Vec::new();
    if prompt_yes_no(rl, "Enable code interpreter")? {
        tools.push(Tool::code_interpreter());
    }
    if prompt_yes_no(rl, "Enable file search")? {
        tools.push(Tool::named(config.file_search_tool.clone()));
    }

    println!("{}", "Creating your assistant...".bright_black());
    let assistant = orchestrator
        .client()
        .create_assistant(CreateAssistant {
            name: if name.is_empty() { None } else { Some(name) },
            model: if model.is_empty() { None } else { Some(model) },
            instructions: if instructions.is_empty() {
                None
            } else {
                Some(instructions)
            },
            tools,
            file_ids: session.file_ids(),
        })
        .await?;

    println!(
        "{}",
        "Assistant created! Setting up conversation thread...".bright_black()
    );
    let thread_id = orchestrator.client().create_thread().await?;

    session.assistant_id = Some(assistant.id);
    session.assistant_name = assistant.name;
    session.thread_id = Some(thread_id);

    let display_name = session.assistant_name.as_deref().unwrap_or("Assistant");
    println!(
        "{}",
        format!("Assistant \"{}\" created and ready!", display_name).green()
    );
    println!(
        "{}",
        "You can now start chatting. /upload <path> attaches files, /new starts over.".bright_black()
    );
    Ok(())
}

/// Uploads each named file and records the returned references. Reports a
/// per-file error and a final success count.
async fn upload_files(
    client: &AssistantsClient<HttpTransport>,
    session: &mut Session,
    paths: &[&str],
) -> Result<()> {
    let mut success_count = 0;

    for path in paths {
        let display_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("{}", format!("Could not read {}: {}", path, e).red());
                continue;
            }
        };

        match client.upload_file(bytes, &display_name).await {
            Ok(file_id) => {
                println!("{}", format!("Uploaded file: {}", display_name).green());
                session.record_uploaded_file(UploadedFileRef {
                    file_id,
                    display_name,
                });
                success_count += 1;
            }
            Err(e) => eprintln!("{}", e.to_string().red()),
        }
    }

    if success_count > 0 {
        println!(
            "{}",
            format!("Successfully uploaded {} file(s).", success_count).green()
        );
        println!(
            "{}",
            "Uploaded files are attached the next time an assistant is created.".bright_black()
        );
    } else {
        println!("{}", "Failed to upload files.".red());
    }
    Ok(())
}

fn list_files(session: &Session) {
    if session.uploaded_files.is_empty() {
        println!("{}", "No files uploaded yet.".bright_black());
        return;
    }
    for file in &session.uploaded_files {
        println!("  {}  {}", file.display_name, file.file_id.bright_black());
    }
}

fn show_history(transcript: &[ConversationMessage]) {
    if transcript.is_empty() {
        println!("{}", "No messages yet.".bright_black());
        return;
    }
    for message in transcript {
        let label = match message.role {
            MessageRole::User => "you".green(),
            MessageRole::Assistant => "assistant".bright_blue(),
            MessageRole::System => "system".yellow(),
        };
        println!("[{}]", label);
        for line in message.content.lines() {
            println!("  {}", line);
        }
    }
}

async fn chat_turn(
    orchestrator: &RunOrchestrator<HttpTransport>,
    session: &Session,
    transcript: &mut Vec<ConversationMessage>,
    input: &str,
) {
    transcript.push(ConversationMessage::now(MessageRole::User, input));
    println!("{}", "Assistant is thinking...".bright_black());

    match orchestrator.run_turn(session, input).await {
        Ok(reply) if reply.is_empty() => {
            println!("{}", "(no reply)".bright_black());
        }
        Ok(reply) => {
            for line in reply.text.lines() {
                println!("{}", line.bright_blue());
            }
            transcript.push(ConversationMessage::now(MessageRole::Assistant, reply.text));
        }
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            transcript.push(ConversationMessage::now(MessageRole::System, e.to_string()));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ApiConfig::load()?;
    if let Some(model) = cli.model {
        config.default_model = model;
    }

    let transport = HttpTransport::new(config.clone());
    let client = AssistantsClient::new(transport, config.default_model.clone());
    let policy = PollPolicy::default().with_max_polls(cli.max_polls);
    let orchestrator = RunOrchestrator::new(client, policy);

    let mut rl: Repl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Adjutant ===".bright_magenta().bold());

    let mut session = Session::new();
    let mut transcript: Vec<ConversationMessage> = Vec::new();
    setup(&orchestrator, &config, &mut rl, &mut session).await?;

    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if let Some(rest) = trimmed.strip_prefix("/upload") {
                    let paths: Vec<&str> = rest.split_whitespace().collect();
                    if paths.is_empty() {
                        println!("{}", "Usage: /upload <path> [<path>...]".bright_black());
                    } else {
                        upload_files(orchestrator.client(), &mut session, &paths).await?;
                    }
                    continue;
                }

                if trimmed == "/files" {
                    list_files(&session);
                    continue;
                }

                if trimmed == "/history" {
                    show_history(&transcript);
                    continue;
                }

                if trimmed == "/new" {
                    session.reset();
                    transcript.clear();
                    println!("{}", "Starting over with a new assistant.".yellow());
                    setup(&orchestrator, &config, &mut rl, &mut session).await?;
                    continue;
                }

                println!("{}", format!("> {}", trimmed).green());
                chat_turn(&orchestrator, &session, &mut transcript, trimmed).await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

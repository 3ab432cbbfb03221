use anyhow::Result;
use clap::Parser;
use personae::cli::{Cli, Commands};
use personae::config::Settings;
use personae::{utils, ChatError, ChatService, GeminiClient, SqliteStore};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::new()?;
    let api_key = Settings::api_key()?;

    let store = Arc::new(SqliteStore::open(&settings.database.path)?);
    let client = GeminiClient::new(&settings.generation, api_key)?;
    let service = ChatService::new(store, client, settings.memory.clone());

    service.seed_characters().await?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Characters => handle_characters(&service).await,
        Commands::AddCharacter {
            name,
            description,
            prompt_template,
        } => handle_add_character(&service, name, description, prompt_template).await,
        Commands::Chat {
            character,
            message,
            user,
            session,
        } => handle_chat(&service, character, message, user, session).await,
        Commands::Interactive {
            character,
            user,
            session,
        } => handle_interactive(&service, character, user, session).await,
        Commands::History { session_id } => handle_history(&service, session_id).await,
        Commands::UserHistory { user_id } => handle_user_history(&service, user_id).await,
        Commands::Sessions => handle_sessions(&service).await,
    }
}

async fn handle_characters(service: &ChatService) -> Result<()> {
    let characters = service.list_characters().await?;
    utils::print_header("Characters");
    for character in characters {
        println!("{} - {}", character.name, character.description);
    }
    Ok(())
}

async fn handle_add_character(
    service: &ChatService,
    name: String,
    description: String,
    prompt_template: String,
) -> Result<()> {
    match service
        .add_character(&name, &description, &prompt_template)
        .await
    {
        Ok(character) => {
            utils::print_success(&format!(
                "Character '{}' added successfully!\nDescription: {}",
                character.name, character.description
            ));
        }
        Err(ChatError::DuplicateName(name)) => {
            utils::print_error(&format!("Character '{}' already exists!", name));
        }
        Err(e) => utils::print_error(&format!("An error occurred while adding the character: {}", e)),
    }
    Ok(())
}

async fn handle_chat(
    service: &ChatService,
    character: String,
    message: String,
    user: i64,
    session: Option<String>,
) -> Result<()> {
    match service.chat(&character, &message, user, session).await {
        Ok(reply) => {
            utils::print_info(&format!("Session: {}", reply.session_id));
            println!("\n{}", reply.text);
        }
        Err(ChatError::CharacterNotFound(_)) => utils::print_error("Character not found."),
        Err(e) => utils::print_error(&format!("An unexpected error occurred: {}", e)),
    }
    Ok(())
}

async fn handle_interactive(
    service: &ChatService,
    character: String,
    user: i64,
    session: Option<String>,
) -> Result<()> {
    utils::print_header(&format!("Chatting with {}", character));
    utils::print_info("Type your messages (Ctrl+C to exit)\n");

    let mut session = session;
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match service.chat(&character, input, user, session.clone()).await {
            Ok(reply) => {
                if session.is_none() {
                    utils::print_info(&format!("Session: {}", reply.session_id));
                }
                session = Some(reply.session_id.clone());
                println!("{}: {}\n", character, reply.text);
            }
            Err(ChatError::CharacterNotFound(_)) => {
                utils::print_error("Character not found.");
                break;
            }
            Err(e) => utils::print_error(&format!("An unexpected error occurred: {}", e)),
        }
    }

    Ok(())
}

async fn handle_history(service: &ChatService, session_id: String) -> Result<()> {
    let transcript = service.history(&session_id).await?;
    println!("{}", transcript);
    Ok(())
}

async fn handle_user_history(service: &ChatService, user_id: i64) -> Result<()> {
    let turns = service.history_by_user(user_id).await?;
    if turns.is_empty() {
        utils::print_info("No conversations found for this user.");
        return Ok(());
    }
    utils::print_header(&format!("History for user {}", user_id));
    for turn in &turns {
        utils::print_turn(turn);
    }
    Ok(())
}

async fn handle_sessions(service: &ChatService) -> Result<()> {
    let summaries = service.list_sessions().await?;
    if summaries.is_empty() {
        utils::print_info("No sessions stored yet.");
        return Ok(());
    }
    utils::print_header("Sessions");
    for summary in &summaries {
        println!(
            "{}  {}  {}  {} turn(s)",
            summary.session_id,
            summary.character_name,
            summary.first_timestamp.format("%Y-%m-%d %H:%M:%S"),
            summary.turn_count
        );
    }
    Ok(())
}

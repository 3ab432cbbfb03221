use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "personae")]
#[command(author, version, about = "Persona-based chat against a hosted generation endpoint", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List stored characters
    Characters,

    /// Add a new character
    AddCharacter {
        name: String,

        #[arg(short, long)]
        description: String,

        /// Persona-defining instruction prepended to every prompt
        #[arg(short, long)]
        prompt_template: String,
    },

    /// Send one message to a character
    Chat {
        /// Character name to chat with
        character: String,

        message: String,

        /// Opaque caller-supplied user id
        #[arg(short, long)]
        user: i64,

        /// Resume an existing session; omitted means start a fresh one
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Start an interactive chat session with a character
    Interactive {
        character: String,

        #[arg(short, long)]
        user: i64,

        /// Resume an existing session instead of starting fresh
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Print the transcript of one session
    History { session_id: String },

    /// Print all of a user's turns across sessions
    UserHistory { user_id: i64 },

    /// List stored sessions, newest first
    Sessions,
}

use crate::store::ConversationTurn;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.len()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_error(text: &str) {
    eprintln!("{}", text.red().bold());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_prompt(text: &str) {
    print!("{}", text.yellow().bold());
}

/// One stored turn, rendered for terminal display.
pub fn print_turn(turn: &ConversationTurn) {
    println!(
        "{}",
        format!("[{}]", turn.timestamp.format("%Y-%m-%d %H:%M:%S")).bright_black()
    );
    println!("{} {}", "User:".yellow(), turn.user_input.as_deref().unwrap_or(""));
    println!("{} {}\n", "Bot:".cyan(), turn.bot_response);
}

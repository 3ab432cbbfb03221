//! Prompt assembly
//!
//! Pure string construction, no I/O, so output is golden-testable. The
//! assembler applies no truncation or token budgeting; bounding the prior
//! turns handed in is the caller's job.

use crate::store::{Character, ConversationTurn};

/// Build the full payload text for one generation call.
///
/// Shape with no prior turns:
/// ```text
/// {template}
/// User: {input}
/// Bot:
/// ```
/// With prior turns, each is rendered as `User: {input}\nBot: {response}`
/// and the renderings are joined by a single space between the template
/// line and the new turn. Nothing follows the trailing `Bot:`.
pub fn build_prompt(
    character: &Character,
    prior_turns: &[ConversationTurn],
    user_input: &str,
) -> String {
    if prior_turns.is_empty() {
        return format!(
            "{}\nUser: {}\nBot:",
            character.prompt_template, user_input
        );
    }

    let context = prior_turns
        .iter()
        .map(|turn| {
            format!(
                "User: {}\nBot: {}",
                turn.user_input.as_deref().unwrap_or(""),
                turn.bot_response
            )
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "{}\n{}\nUser: {}\nBot:",
        character.prompt_template, context, user_input
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn character(template: &str) -> Character {
        Character {
            id: 1,
            name: "X".to_string(),
            description: "test".to_string(),
            prompt_template: template.to_string(),
        }
    }

    fn turn(user_input: Option<&str>, bot_response: &str) -> ConversationTurn {
        ConversationTurn {
            id: 0,
            character_id: 1,
            user_id: 1,
            session_id: Some("s".to_string()),
            user_input: user_input.map(str::to_string),
            bot_response: bot_response.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_context_is_template_plus_new_turn() {
        let prompt = build_prompt(&character("You are X."), &[], "hi");
        assert_eq!(prompt, "You are X.\nUser: hi\nBot:");
    }

    #[test]
    fn single_prior_turn_is_folded_in() {
        let prompt = build_prompt(&character("You are X."), &[turn(Some("a"), "b")], "c");
        assert_eq!(prompt, "You are X.\nUser: a\nBot: b\nUser: c\nBot:");
    }

    #[test]
    fn multiple_prior_turns_join_with_a_space() {
        let prompt = build_prompt(
            &character("T"),
            &[turn(Some("a"), "b"), turn(Some("c"), "d")],
            "e",
        );
        assert_eq!(prompt, "T\nUser: a\nBot: b User: c\nBot: d\nUser: e\nBot:");
    }

    #[test]
    fn seeded_turn_without_user_text_renders_empty() {
        let prompt = build_prompt(&character("T"), &[turn(None, "opening line")], "hi");
        assert_eq!(prompt, "T\nUser: \nBot: opening line\nUser: hi\nBot:");
    }

    #[test]
    fn output_is_deterministic() {
        let turns = [turn(Some("a"), "b")];
        let c = character("T");
        assert_eq!(build_prompt(&c, &turns, "x"), build_prompt(&c, &turns, "x"));
    }
}

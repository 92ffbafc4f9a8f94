//! Fixed persona prompt and request assembly

use think_space_core::session::ChatMessage;
use think_space_providers::Message;

/// Instruction block prepended to every upstream call. Never stored in a session.
pub const SYSTEM_PROMPT: &str = r#"
You are 'Think-Space', an expert assistant in brainstorming and creative strategy.
Your goal is to help the user explore ideas in unconventional ways.
Style: professional, inspiring, concise.
Response structure:
1. The Flash Idea (one striking sentence).
2. 3 Exploration Axes (key points).
3. The Challenge (a potential obstacle to anticipate).
Address the user informally to create a sense of creative closeness.
"#;

/// Build the upstream message list: system prompt, stored history, then the new user turn.
pub fn build_messages(history: &[ChatMessage], prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(SYSTEM_PROMPT));
    messages.extend(history.iter().map(Message::from));
    messages.push(Message::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use think_space_core::session::Role;

    #[test]
    fn test_build_messages_without_history() {
        let messages = build_messages(&[], "idea A");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1], Message::user("idea A"));
    }

    #[test]
    fn test_build_messages_replays_history_in_order() {
        let history = vec![
            ChatMessage::new(Role::User, "idea A"),
            ChatMessage::new(Role::Assistant, "reply A"),
        ];
        let messages = build_messages(&history, "idea B");

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[2].content, "reply A");
        assert_eq!(messages[3].content, "idea B");
    }
}

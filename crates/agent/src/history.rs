//! History trimming for interactive sessions.

use webseek_core::message::{Message, Role};

/// Keep every system message plus the most recent other messages.
///
/// At most `max` messages are kept when possible; at least one non-system
/// message always survives. If the kept tail does not start with a user
/// message, it is advanced to the first user message in it.
pub fn trim_history(messages: &[Message], max: usize) -> Vec<Message> {
    if messages.len() <= max {
        return messages.to_vec();
    }

    let (system, other): (Vec<&Message>, Vec<&Message>) =
        messages.iter().partition(|m| m.role == Role::System);

    let slots = max.saturating_sub(system.len()).max(1);
    let mut recent = &other[other.len().saturating_sub(slots)..];

    if recent.first().is_some_and(|m| m.role != Role::User)
        && let Some(first_user) = recent.iter().position(|m| m.role == Role::User)
    {
        recent = &recent[first_user..];
    }

    system.into_iter().chain(recent.iter().copied()).cloned().collect()
}

//! Application handlers wired up by the `cordlink` binary.

use serde::Deserialize;

use crate::gateway::dispatcher::HandlerResult;
use crate::gateway::events::DispatchEvent;

pub const MESSAGE_REACTION_ADD: &str = "MESSAGE_REACTION_ADD";

#[derive(Debug, Deserialize)]
pub struct ReactionAdd {
    pub user_id: String,
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub emoji: PartialEmoji,
}

#[derive(Debug, Deserialize)]
pub struct PartialEmoji {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl PartialEmoji {
    /// `<:name:id>` for custom emoji, the unicode character otherwise.
    pub fn display(&self) -> String {
        match (&self.id, &self.name) {
            (Some(id), Some(name)) => format!("<:{name}:{id}>"),
            (Some(id), None) => format!("<:_:{id}>"),
            (None, Some(name)) => name.clone(),
            (None, None) => "?".to_string(),
        }
    }
}

/// Log every reaction added to a message.
pub fn log_reaction(event: &DispatchEvent) -> HandlerResult {
    let reaction: ReactionAdd = serde_json::from_value(event.payload.clone())?;
    tracing::info!(
        seq = ?event.sequence,
        user = %reaction.user_id,
        message = %reaction.message_id,
        channel = %reaction.channel_id,
        guild = ?reaction.guild_id,
        "reaction {} added",
        reaction.emoji.display()
    );
    Ok(())
}

use crate::error::GatewayError;

pub const GUILDS: u64 = 1 << 0;
pub const GUILD_MEMBERS: u64 = 1 << 1;
pub const GUILD_MODERATION: u64 = 1 << 2;
pub const GUILD_EXPRESSIONS: u64 = 1 << 3;
pub const GUILD_INTEGRATIONS: u64 = 1 << 4;
pub const GUILD_WEBHOOKS: u64 = 1 << 5;
pub const GUILD_INVITES: u64 = 1 << 6;
pub const GUILD_VOICE_STATES: u64 = 1 << 7;
pub const GUILD_PRESENCES: u64 = 1 << 8;
pub const GUILD_MESSAGES: u64 = 1 << 9;
pub const GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
pub const GUILD_MESSAGE_TYPING: u64 = 1 << 11;
pub const DIRECT_MESSAGES: u64 = 1 << 12;
pub const DIRECT_MESSAGE_REACTIONS: u64 = 1 << 13;
pub const DIRECT_MESSAGE_TYPING: u64 = 1 << 14;
pub const MESSAGE_CONTENT: u64 = 1 << 15;
pub const GUILD_SCHEDULED_EVENTS: u64 = 1 << 16;
pub const AUTO_MODERATION_CONFIGURATION: u64 = 1 << 20;
pub const AUTO_MODERATION_EXECUTION: u64 = 1 << 21;

/// All known intent names with their bits.
pub const ALL_INTENTS: &[(&str, u64)] = &[
    ("GUILDS", GUILDS),
    ("GUILD_MEMBERS", GUILD_MEMBERS),
    ("GUILD_MODERATION", GUILD_MODERATION),
    ("GUILD_EXPRESSIONS", GUILD_EXPRESSIONS),
    ("GUILD_INTEGRATIONS", GUILD_INTEGRATIONS),
    ("GUILD_WEBHOOKS", GUILD_WEBHOOKS),
    ("GUILD_INVITES", GUILD_INVITES),
    ("GUILD_VOICE_STATES", GUILD_VOICE_STATES),
    ("GUILD_PRESENCES", GUILD_PRESENCES),
    ("GUILD_MESSAGES", GUILD_MESSAGES),
    ("GUILD_MESSAGE_REACTIONS", GUILD_MESSAGE_REACTIONS),
    ("GUILD_MESSAGE_TYPING", GUILD_MESSAGE_TYPING),
    ("DIRECT_MESSAGES", DIRECT_MESSAGES),
    ("DIRECT_MESSAGE_REACTIONS", DIRECT_MESSAGE_REACTIONS),
    ("DIRECT_MESSAGE_TYPING", DIRECT_MESSAGE_TYPING),
    ("MESSAGE_CONTENT", MESSAGE_CONTENT),
    ("GUILD_SCHEDULED_EVENTS", GUILD_SCHEDULED_EVENTS),
    ("AUTO_MODERATION_CONFIGURATION", AUTO_MODERATION_CONFIGURATION),
    ("AUTO_MODERATION_EXECUTION", AUTO_MODERATION_EXECUTION),
];

/// Intents that must be enabled for the application in the developer portal.
pub const PRIVILEGED_INTENTS: u64 = GUILD_MEMBERS | GUILD_PRESENCES | MESSAGE_CONTENT;

/// Parse an intents value: either a raw integer bitmask or a comma-separated
/// list of intent names (case-insensitive).
pub fn parse(value: &str) -> Result<u64, GatewayError> {
    let value = value.trim();
    if let Ok(bits) = value.parse::<u64>() {
        return Ok(bits);
    }

    let mut bits = 0;
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let upper = name.to_ascii_uppercase();
        match ALL_INTENTS.iter().find(|(known, _)| *known == upper) {
            Some((_, bit)) => bits |= bit,
            None => return Err(GatewayError::Config(format!("unknown intent '{name}'"))),
        }
    }
    Ok(bits)
}

/// Names of the known intents set in `bits`.
pub fn names(bits: u64) -> Vec<&'static str> {
    ALL_INTENTS
        .iter()
        .filter(|(_, bit)| bits & bit != 0)
        .map(|(name, _)| *name)
        .collect()
}

/// Map a dispatch event name to the intent that gates it.
pub fn intent_for_event(event_name: &str) -> Option<u64> {
    match event_name {
        "GUILD_CREATE" | "GUILD_UPDATE" | "GUILD_DELETE" | "CHANNEL_CREATE"
        | "CHANNEL_UPDATE" | "CHANNEL_DELETE" | "CHANNEL_PINS_UPDATE" | "THREAD_CREATE"
        | "THREAD_UPDATE" | "THREAD_DELETE" | "GUILD_ROLE_CREATE" | "GUILD_ROLE_UPDATE"
        | "GUILD_ROLE_DELETE" => Some(GUILDS),
        "GUILD_MEMBER_ADD" | "GUILD_MEMBER_UPDATE" | "GUILD_MEMBER_REMOVE" => Some(GUILD_MEMBERS),
        "GUILD_BAN_ADD" | "GUILD_BAN_REMOVE" | "GUILD_AUDIT_LOG_ENTRY_CREATE" => {
            Some(GUILD_MODERATION)
        }
        "GUILD_EMOJIS_UPDATE" | "GUILD_STICKERS_UPDATE" => Some(GUILD_EXPRESSIONS),
        "INVITE_CREATE" | "INVITE_DELETE" => Some(GUILD_INVITES),
        "VOICE_STATE_UPDATE" => Some(GUILD_VOICE_STATES),
        "PRESENCE_UPDATE" => Some(GUILD_PRESENCES),
        "MESSAGE_CREATE" | "MESSAGE_UPDATE" | "MESSAGE_DELETE" | "MESSAGE_DELETE_BULK" => {
            Some(GUILD_MESSAGES | DIRECT_MESSAGES)
        }
        "MESSAGE_REACTION_ADD" | "MESSAGE_REACTION_REMOVE" | "MESSAGE_REACTION_REMOVE_ALL"
        | "MESSAGE_REACTION_REMOVE_EMOJI" => {
            Some(GUILD_MESSAGE_REACTIONS | DIRECT_MESSAGE_REACTIONS)
        }
        "TYPING_START" => Some(GUILD_MESSAGE_TYPING | DIRECT_MESSAGE_TYPING),
        "GUILD_SCHEDULED_EVENT_CREATE" | "GUILD_SCHEDULED_EVENT_UPDATE"
        | "GUILD_SCHEDULED_EVENT_DELETE" => Some(GUILD_SCHEDULED_EVENTS),
        "AUTO_MODERATION_RULE_CREATE" | "AUTO_MODERATION_RULE_UPDATE"
        | "AUTO_MODERATION_RULE_DELETE" => Some(AUTO_MODERATION_CONFIGURATION),
        "AUTO_MODERATION_ACTION_EXECUTION" => Some(AUTO_MODERATION_EXECUTION),
        // READY, RESUMED, INTERACTION_CREATE, ...
        _ => None,
    }
}

/// Check whether `bits` lets the gateway deliver `event_name`. An event gated
/// by several intents (guild and DM variants) needs any one of them.
pub fn has_intent(bits: u64, event_name: &str) -> bool {
    match intent_for_event(event_name) {
        Some(required) => bits & required != 0,
        None => true,
    }
}

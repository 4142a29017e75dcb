use relay_common::{ChannelId, GuildId};

/// Check if a peer is allowed to interact with the bot.
///
/// An empty allowlist means everyone is allowed (open policy).
/// Entries are matched case-insensitively against the peer ID.
/// Supports exact match and glob-style `*` wildcards.
pub fn is_allowed(peer_id: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let peer_lower = peer_id.to_lowercase();
    allowlist.iter().any(|pattern| {
        let pat = pattern.trim().to_lowercase();
        if pat.contains('*') {
            glob_match(&pat, &peer_lower)
        } else {
            pat == peer_lower
        }
    })
}

/// Simple glob matching supporting `*` as a wildcard for any sequence of chars.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(idx) => {
                // First segment must match at start
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            },
            None => return false,
        }
    }
    // Last segment must match at end (unless pattern ends with *)
    if !parts.last().unwrap_or(&"").is_empty() {
        pos == text.len()
    } else {
        true
    }
}

/// Where the bot is willing to answer.
///
/// Guild entries only constrain guild traffic; a direct message has no
/// guild and passes the guild check only when that list is open.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    pub guilds: Vec<String>,
    pub channels: Vec<String>,
}

impl AccessPolicy {
    pub fn new(guilds: Vec<String>, channels: Vec<String>) -> Self {
        Self { guilds, channels }
    }

    pub fn permits(&self, guild_id: Option<GuildId>, channel_id: ChannelId) -> bool {
        let guild_ok = match guild_id {
            Some(id) => is_allowed(&id.to_string(), &self.guilds),
            None => self.guilds.is_empty(),
        };
        guild_ok && is_allowed(&channel_id.to_string(), &self.channels)
    }
}

use relay_common::UserId;

/// Remove `<@id>` and `<@!id>` tokens addressing `user_id`, then trim.
///
/// Mentions of other users are left alone.
pub fn strip_mentions(content: &str, user_id: UserId) -> String {
    let plain = format!("<@{user_id}>");
    let nick = format!("<@!{user_id}>");
    content.replace(&plain, "").replace(&nick, "").trim().to_string()
}

/// Whether `content` carries a mention token for `user_id`.
pub fn mentions(content: &str, user_id: UserId) -> bool {
    content.contains(&format!("<@{user_id}>")) || content.contains(&format!("<@!{user_id}>"))
}

use chrono::{DateTime, TimeZone};

use crate::transport::TransportEvent;

/// `nick!user@host` → `nick`.
pub fn nick_from_prefix(prefix: &str) -> &str {
    prefix.split('!').next().unwrap_or(prefix)
}

/// C `asctime` layout used in connect/disconnect markers.
pub fn render_asctime<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%a %b %e %H:%M:%S %Y").to_string()
}

/// Renders the log line for an inbound event, or `None` when the event is not
/// logged. Membership and topic events only count for `channel`; quits and
/// nick changes carry no channel and are always logged.
pub fn render_log_line(event: &TransportEvent, channel: &str, own_nick: &str) -> Option<String> {
    let same_channel = |candidate: &str| candidate.eq_ignore_ascii_case(channel);
    match event {
        TransportEvent::Message {
            prefix,
            target,
            text,
        } if same_channel(target) => Some(format!("<{}> {}", nick_from_prefix(prefix), text)),
        TransportEvent::Action {
            prefix,
            target,
            text,
        } if same_channel(target) => Some(format!("* {} {}", nick_from_prefix(prefix), text)),
        TransportEvent::Join { prefix, channel: joined } if same_channel(joined) => {
            let nick = nick_from_prefix(prefix);
            if nick.eq_ignore_ascii_case(own_nick) {
                Some(format!("[I have joined {joined}]"))
            } else {
                Some(format!("{nick} has joined {joined} ({prefix})"))
            }
        }
        TransportEvent::Part { prefix, channel: left } if same_channel(left) => Some(format!(
            "{} has left {} ({})",
            nick_from_prefix(prefix),
            left,
            prefix
        )),
        TransportEvent::Quit { prefix, reason } => Some(format!(
            "{} has quit [{}] ({})",
            nick_from_prefix(prefix),
            reason,
            prefix
        )),
        TransportEvent::NickChange { prefix, new_nick } => Some(format!(
            "{} is now known as {} ({})",
            nick_from_prefix(prefix),
            new_nick,
            prefix
        )),
        TransportEvent::Topic {
            prefix,
            channel: topic_channel,
            topic,
        } if same_channel(topic_channel) => Some(format!(
            "{} set the topic to {} ({})",
            nick_from_prefix(prefix),
            topic,
            prefix
        )),
        TransportEvent::Kick {
            prefix,
            channel: kick_channel,
            kicked,
            reason,
        } if same_channel(kick_channel) => Some(format!(
            "{} was kicked by {} ({}) for reason [{}]",
            kicked,
            nick_from_prefix(prefix),
            prefix,
            reason
        )),
        _ => None,
    }
}

//! IRC line codec: `[:prefix] COMMAND params [:trailing]`.

use crate::transport::{OutboundCommand, TransportEvent};

const ACTION_OPEN: &str = "\u{1}ACTION ";
const CTCP_DELIMITER: char = '\u{1}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcLine {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

/// Parses one server line. Returns `None` for blank lines or a bare prefix.
pub fn parse_irc_line(raw: &str) -> Option<IrcLine> {
    let mut rest = raw.trim_end_matches(['\r', '\n']);
    let mut prefix = None;
    if let Some(stripped) = rest.strip_prefix(':') {
        let (source, remainder) = stripped.split_once(' ')?;
        prefix = Some(source.to_string());
        rest = remainder;
    }

    rest = rest.trim_start_matches(' ');
    let (command, mut remainder) = match rest.split_once(' ') {
        Some((command, remainder)) => (command, remainder),
        None => (rest, ""),
    };
    if command.is_empty() {
        return None;
    }

    let mut params = Vec::new();
    loop {
        remainder = remainder.trim_start_matches(' ');
        if remainder.is_empty() {
            break;
        }
        if let Some(trailing) = remainder.strip_prefix(':') {
            params.push(trailing.to_string());
            break;
        }
        match remainder.split_once(' ') {
            Some((param, next)) => {
                params.push(param.to_string());
                remainder = next;
            }
            None => {
                params.push(remainder.to_string());
                break;
            }
        }
    }

    Some(IrcLine {
        prefix,
        command: command.to_ascii_uppercase(),
        params,
    })
}

/// Maps a parsed line onto the events the session understands.
pub fn event_from_line(line: IrcLine) -> TransportEvent {
    let prefix = line.prefix.unwrap_or_default();
    let mut params = line.params.into_iter();
    match line.command.as_str() {
        "001" => TransportEvent::Registered,
        "433" => {
            let _own = params.next();
            match params.next() {
                Some(attempted) => TransportEvent::NickInUse { attempted },
                None => TransportEvent::Other,
            }
        }
        "PING" => TransportEvent::Ping {
            token: params.last().unwrap_or_default(),
        },
        "PRIVMSG" => match (params.next(), params.next()) {
            (Some(target), Some(text)) => privmsg_event(prefix, target, text),
            _ => TransportEvent::Other,
        },
        "JOIN" => match params.last() {
            Some(channel) => TransportEvent::Join { prefix, channel },
            None => TransportEvent::Other,
        },
        "PART" => match params.next() {
            Some(channel) => TransportEvent::Part { prefix, channel },
            None => TransportEvent::Other,
        },
        "QUIT" => TransportEvent::Quit {
            prefix,
            reason: params.next().unwrap_or_default(),
        },
        "NICK" => match params.next() {
            Some(new_nick) => TransportEvent::NickChange { prefix, new_nick },
            None => TransportEvent::Other,
        },
        "TOPIC" => match (params.next(), params.next()) {
            (Some(channel), Some(topic)) => TransportEvent::Topic {
                prefix,
                channel,
                topic,
            },
            _ => TransportEvent::Other,
        },
        "KICK" => {
            let collected = params.collect::<Vec<_>>();
            match collected.as_slice() {
                [channel, kicked, ..] => TransportEvent::Kick {
                    prefix,
                    channel: channel.clone(),
                    kicked: kicked.clone(),
                    reason: collected.last().cloned().unwrap_or_default(),
                },
                _ => TransportEvent::Other,
            }
        }
        _ => TransportEvent::Other,
    }
}

fn privmsg_event(prefix: String, target: String, text: String) -> TransportEvent {
    if let Some(body) = text.strip_prefix(ACTION_OPEN) {
        let body = body.strip_suffix(CTCP_DELIMITER).unwrap_or(body);
        return TransportEvent::Action {
            prefix,
            target,
            text: body.to_string(),
        };
    }
    if text.starts_with(CTCP_DELIMITER) {
        return TransportEvent::Other;
    }
    TransportEvent::Message {
        prefix,
        target,
        text,
    }
}

/// Renders an outbound command without the trailing CRLF. Line breaks inside
/// arguments are replaced so one command always stays one line.
pub fn render_command(command: &OutboundCommand) -> String {
    match command {
        OutboundCommand::Nick(nick) => format!("NICK {}", single_line(nick)),
        OutboundCommand::User { username, realname } => {
            format!(
                "USER {} 0 * :{}",
                single_line(username),
                single_line(realname)
            )
        }
        OutboundCommand::Join(channel) => format!("JOIN {}", single_line(channel)),
        OutboundCommand::Privmsg { target, text } => {
            format!("PRIVMSG {} :{}", single_line(target), single_line(text))
        }
        OutboundCommand::Notice { target, text } => {
            format!("NOTICE {} :{}", single_line(target), single_line(text))
        }
        OutboundCommand::Pong(token) => format!("PONG :{}", single_line(token)),
        OutboundCommand::Quit(reason) => format!("QUIT :{}", single_line(reason)),
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

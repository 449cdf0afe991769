#![no_main]

use ichiryu_session::{event_from_line, parse_irc_line, render_command, OutboundCommand};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Some(line) = parse_irc_line(&raw) {
        assert!(!line.command.is_empty());
        let _ = event_from_line(line);
    }
    let rendered = render_command(&OutboundCommand::Privmsg {
        target: "#wonted".to_string(),
        text: raw.into_owned(),
    });
    assert!(!rendered.contains('\n'));
    assert!(!rendered.contains('\r'));
});

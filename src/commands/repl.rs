//! Read-eval-print loop over any line source

use std::io::{self, BufRead, Write};

use super::dispatch_line;
use crate::audio::host::AudioHost;
use crate::session::{Flow, Session};

pub const PROMPT: &str = "  > ";

/// Read commands until `quit` or end of input
pub fn run<H: AudioHost>(session: &mut Session<H>, mut input: impl BufRead, out: &mut dyn Write) -> io::Result<()> {
    let mut line = String::new();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            log::debug!("End of input, leaving command loop");
            return Ok(());
        }

        if dispatch_line(session, &line, out)? == Flow::Quit {
            log::debug!("Quit requested");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::config::TesterConfig;
    use crate::testing::{device, FakeHost};

    fn run_script(script: &str) -> (Session<FakeHost>, String) {
        let mut line = device(0, "HDA Intel PCH", 2, 2, 44100);
        line.is_default_input = true;
        line.is_default_output = true;
        let host = FakeHost::new(vec![line, device(1, "USB Headset", 1, 2, 48000)]);
        let mut session = Session::new(host, TesterConfig::default(), CancelToken::new());
        let mut out = Vec::new();
        run(&mut session, script.as_bytes(), &mut out).unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_quit_stops_reading() {
        let (session, text) = run_script("quit\ntone\n");
        assert!(session.host().played().is_empty());
        assert_eq!(text, PROMPT);
    }

    #[test]
    fn test_eof_exits_cleanly() {
        let (_, text) = run_script("");
        assert_eq!(text, format!("{}\n", PROMPT));
    }

    #[test]
    fn test_unknown_command_keeps_going() {
        let (session, text) = run_script("bogus\n\noutput 1\ntone 300 0.1\nq\n");
        assert!(text.contains("Unknown command: bogus. Type 'help' for commands."));
        assert!(text.contains("Output device set to: USB Headset (#1)"));
        let played = session.host().played();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].device, 1);
        assert_eq!(played[0].frames, 4800);
        assert_eq!(text.matches(PROMPT).count(), 5);
    }

    #[test]
    fn test_errors_do_not_end_session() {
        let (session, text) = run_script("tone x\noutput 9\nuse\nleft\nexit\n");
        assert!(text.contains("  Error: invalid frequency 'x'"));
        assert!(text.contains("  Error: device 9 not found"));
        assert!(text.contains("  Usage: use <line|usb>"));
        assert_eq!(session.host().played().len(), 1);
    }

    #[test]
    fn test_help_and_mic() {
        let (session, text) = run_script("help\nmic\nq\n");
        assert!(text.contains("use <line|usb>   Select devices by type"));
        assert!(text.contains("Stopped."));
        assert_eq!(session.host().meter_requests().len(), 1);
    }
}

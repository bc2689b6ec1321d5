use std::io::Write;
use std::process::{Command, Stdio};

use crate::tracker::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClipboardError {
    #[snafu(display("no clipboard command is configured"))]
    NoCommand {},
    #[snafu(display("could not run the clipboard command {program}"))]
    Spawn {
        source: std::io::Error,
        program: String,
    },
    #[snafu(display("the clipboard command {program} failed: {status}"))]
    Status {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// Where share codes are copied.
pub trait ClipboardSink {
    fn write(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Pipes the text into an external program, such as `xclip -selection clipboard`.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    argv: Vec<String>,
}

impl CommandClipboard {
    pub fn new(argv: &[String]) -> CommandClipboard {
        CommandClipboard {
            argv: argv.to_vec(),
        }
    }
}

impl ClipboardSink for CommandClipboard {
    fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        let (program, args) = self.argv.split_first().context(NoCommandSnafu {})?;
        debug!("CommandClipboard::write: {} {:?}", program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .context(SpawnSnafu { program })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .context(SpawnSnafu { program })?;
        }
        let status = child.wait().context(SpawnSnafu { program })?;
        ensure!(status.success(), StatusSnafu { program, status });
        Ok(())
    }
}

/// Copies a share code, or prints it when the clipboard is not available.
/// Returns whether the code reached the clipboard.
pub fn deliver<C: ClipboardSink + ?Sized>(clipboard: &mut C, code: &str, always_print: bool) -> bool {
    match clipboard.write(code) {
        Ok(()) => {
            info!("Share code copied to the clipboard");
            if always_print {
                println!("{}", code);
            }
            true
        }
        Err(e) => {
            warn!("Could not copy the share code: {}", e);
            println!("Copy the following code manually:");
            println!("{}", code);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        texts: Vec<String>,
    }

    impl ClipboardSink for Recorder {
        fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.texts.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn missing_command_is_an_error() {
        let mut clipboard = CommandClipboard::new(&[]);
        assert!(matches!(
            clipboard.write("x"),
            Err(ClipboardError::NoCommand {})
        ));
        let mut clipboard = CommandClipboard::new(&["/nonexistent/seatbook-clipboard".to_string()]);
        assert!(matches!(
            clipboard.write("x"),
            Err(ClipboardError::Spawn { .. })
        ));
        assert!(!deliver(&mut clipboard, "SEAT_TXT_v1:x", false));
    }

    #[test]
    fn delivered_codes_reach_the_sink() {
        let mut recorder = Recorder::default();
        assert!(deliver(&mut recorder, "SEAT_TXT_v1:x", false));
        assert_eq!(recorder.texts, vec!["SEAT_TXT_v1:x".to_string()]);
    }
}

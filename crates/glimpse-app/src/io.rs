use std::io::BufRead;

use glimpse_types::AppEvent;
use kanal::AsyncSender;
use tokio::runtime::Handle;

/// Map one line of user input to a control event
pub fn parse_command(line: &str) -> Option<AppEvent> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command.to_lowercase().as_str() {
        // Bare Enter presses the start/pause button
        "" | "toggle" | "t" => Some(AppEvent::ToggleOcr),
        "start" | "s" => Some(AppEvent::StartOcr),
        "pause" | "stop" | "p" => Some(AppEvent::PauseOcr),
        "flip" | "f" => Some(AppEvent::ToggleFlip),
        "delay" | "d" => Some(AppEvent::SetDelay(rest.to_string())),
        "status" | "?" => Some(AppEvent::StatusRequest),
        "quit" | "exit" | "q" => Some(AppEvent::Quit),
        _ => None,
    }
}

/// Read control lines from stdin on a dedicated thread.
///
/// Interactive stdin blocks, so it stays off the runtime. The thread ends at
/// EOF or once the app stops listening.
pub fn spawn_stdin_reader(ui_to_app_tx: AsyncSender<AppEvent>) -> std::io::Result<()> {
    let runtime = Handle::current();

    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {}", e);
                        break;
                    }
                };

                let Some(event) = parse_command(&line) else {
                    tracing::warn!("Unknown command: '{}'", line.trim());
                    continue;
                };

                if runtime.block_on(ui_to_app_tx.send(event)).is_err() {
                    break;
                }
            }

            // EOF behaves like quit
            let _ = runtime.block_on(ui_to_app_tx.send(AppEvent::Quit));
            tracing::debug!("stdin reader stopping");
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_buttons() {
        assert!(matches!(parse_command(""), Some(AppEvent::ToggleOcr)));
        assert!(matches!(parse_command("  start "), Some(AppEvent::StartOcr)));
        assert!(matches!(parse_command("PAUSE"), Some(AppEvent::PauseOcr)));
        assert!(matches!(parse_command("flip"), Some(AppEvent::ToggleFlip)));
        assert!(matches!(parse_command("q"), Some(AppEvent::Quit)));
    }

    #[test]
    fn delay_keeps_raw_value() {
        match parse_command("delay   -5 ") {
            Some(AppEvent::SetDelay(raw)) => assert_eq!(raw, "-5"),
            other => panic!("unexpected {other:?}"),
        }
        match parse_command("delay") {
            Some(AppEvent::SetDelay(raw)) => assert!(raw.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_command_is_ignored() {
        assert!(parse_command("recalibrate").is_none());
    }
}

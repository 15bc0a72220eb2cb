//! Line-based intent reader used by the headless client binary

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Move { dx: i32, dy: i32 },
    Interact,
    Quit,
}

/// Maps one command line (`w`/`a`/`s`/`d`, `e`, `q`) to an intent.
pub fn parse_intent(line: &str) -> Option<Intent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "w" => Some(Intent::Move { dx: 0, dy: -1 }),
        "a" => Some(Intent::Move { dx: -1, dy: 0 }),
        "s" => Some(Intent::Move { dx: 0, dy: 1 }),
        "d" => Some(Intent::Move { dx: 1, dy: 0 }),
        "e" => Some(Intent::Interact),
        "q" | "quit" | "exit" => Some(Intent::Quit),
        _ => None,
    }
}

pub struct InputReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> InputReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Waits for the next recognised intent. End of input and read errors
    /// both count as `Quit`; unrecognised lines are skipped.
    pub async fn next_intent(&mut self) -> Intent {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(intent) = parse_intent(&line) {
                        return intent;
                    }
                }
                Ok(None) | Err(_) => return Intent::Quit,
            }
        }
    }
}

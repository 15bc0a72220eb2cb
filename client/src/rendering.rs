//! Textual status view of the merged local and authoritative state

use shared::{PlayerState, WorldFlags};
use std::io::Write;

/// Everything one render pass shows. The first player is always the
/// client's own optimistic copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub players: Vec<PlayerState>,
    pub flags: Option<WorldFlags>,
}

impl Frame {
    pub fn status_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.players.len() + 1);

        if let Some((me, others)) = self.players.split_first() {
            parts.push(format!("{} ({},{}) hp={}", me.id, me.x, me.y, me.health));
            for other in others {
                parts.push(format!("{} ({},{})", other.id, other.x, other.y));
            }
        }

        match self.flags {
            Some(flags) => parts.push(format!(
                "trigger={} portal={}",
                on_off(flags.trigger_active),
                on_off(flags.portal_active)
            )),
            None => parts.push("no snapshot yet".to_string()),
        }

        parts.join(" | ")
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Writes a status line whenever the frame changes.
pub struct Renderer<W> {
    out: W,
    last: Option<Frame>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// Returns true when something was written.
    pub fn render(&mut self, frame: Frame) -> std::io::Result<bool> {
        if self.last.as_ref() == Some(&frame) {
            return Ok(false);
        }
        writeln!(self.out, "{}", frame.status_line())?;
        self.out.flush()?;
        self.last = Some(frame);
        Ok(true)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

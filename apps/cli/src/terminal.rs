use std::io::{self, Write};

use lobber_domain::Note;
use lobber_tutor::Presenter;

const BAR_WIDTH: usize = 40;

/// Prints each note on its own line and redraws a progress bar beneath it.
pub struct TerminalPresenter<W> {
    out: W,
    drawn: Option<usize>,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, drawn: None }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn draw_bar(&mut self, filled: usize) {
        let bar = format!(
            "\r  [{}{}]",
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled)
        );
        let _ = self.out.write_all(bar.as_bytes());
        let _ = self.out.flush();
        self.drawn = Some(filled);
    }
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn show_note(&mut self, note: &Note) {
        if self.drawn.take().is_some() {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out, "  >> {:<3} ({})", note.symbol, note.group.label());
    }

    fn show_progress(&mut self, per_mille: u16) {
        let filled = usize::from(per_mille.min(1_000)) * BAR_WIDTH / 1_000;
        if self.drawn != Some(filled) {
            self.draw_bar(filled);
        }
    }

    fn show_running(&mut self, running: bool) {
        if self.drawn.take().is_some() {
            let _ = writeln!(self.out);
        }
        let message = if running {
            "-- lobbing notes (enter toggles, `help` lists commands) --"
        } else {
            "-- stopped; edit settings or press enter to start --"
        };
        let _ = writeln!(self.out, "{message}");
        let _ = self.out.flush();
    }
}

use lobber_domain::Note;

/// Where the session shows its state.
pub trait Presenter: Send {
    fn show_note(&mut self, note: &Note);
    /// Progress through the current interval, 0 to 1000.
    fn show_progress(&mut self, per_mille: u16);
    /// Flips between the configuration view and the active-session view.
    fn show_running(&mut self, running: bool);
}

pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn show_note(&mut self, _note: &Note) {}
    fn show_progress(&mut self, _per_mille: u16) {}
    fn show_running(&mut self, _running: bool) {}
}

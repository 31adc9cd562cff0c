// state local to the tui; never reaches the engine
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub show_help: bool,
    // synced from DisplayState each frame
    pub playing: bool,
}

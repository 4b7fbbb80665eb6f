use crate::use_cases::Fleet;

#[derive(Clone)]
pub struct AppState {
    // Registry plus update channel; every route and socket goes through this.
    pub fleet: Fleet,
}

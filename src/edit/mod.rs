pub mod history;
pub mod state;

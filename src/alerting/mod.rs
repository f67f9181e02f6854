pub mod sweep;
pub mod transition;

pub mod countdown;
pub mod score;
pub mod selection;
pub mod snapshot;

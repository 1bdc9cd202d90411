//! Client-side core of the TotallyTarian party game: the server's wire types,
//! the pure screen resolver, the announcement sequencer, and local input
//! state. Nothing in this crate performs I/O or reads a clock.

pub mod announcement;
pub mod game_state;
pub mod protocol;
pub mod screen;
pub mod session;

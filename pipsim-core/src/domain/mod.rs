//! Domain types for pipsim

pub mod bar;
pub mod position;
pub mod side;

pub use bar::Bar;
pub use position::{ExitReason, Position, PositionError};
pub use side::{InvalidSide, Side};

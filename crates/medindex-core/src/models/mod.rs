//! Domain models.

mod medicine;

pub use medicine::*;

//! Transaction operations, one module per family.

mod add;
mod merge;
mod moves;
mod rename;
mod terminate;

pub use terminate::select_active;

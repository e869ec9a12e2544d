// Declarative frame layouts
//
// A frame shape is declared once as an ordered list of `Field`s. Reading a
// layout runs each field decoder against a shared `ReadCursor` and yields
// the decoded values in order; typed frame records are then built from
// those values with the `FieldValues` accessors.

pub mod cursor;
pub mod field;

pub use cursor::ReadCursor;
pub use field::{Endian, Field, FieldValue, FieldValues, FrameLayout};

use std::fmt;

/// Errors surfaced by the fallible edges of the core.
///
/// The PPU itself never fails at runtime — bad addresses are masked, palette
/// aliases fold silently, and sprite overflow is a status bit. The only
/// operations that can reject input are save-state restoration and region
/// decoding.
#[derive(Debug)]
pub enum Error {
    /// A state snapshot names a region id this build does not know.
    UnsupportedRegion(u8),
    /// A counter or position in a state snapshot is outside its legal range.
    StateOutOfRange {
        field: &'static str,
        value: i64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedRegion(id) => write!(f, "unsupported region id {id}"),
            Self::StateOutOfRange { field, value } => {
                write!(f, "state field {field} out of range: {value}")
            }
        }
    }
}

impl std::error::Error for Error {}

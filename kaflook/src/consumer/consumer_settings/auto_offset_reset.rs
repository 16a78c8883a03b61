use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AutoOffsetReset {
    Earliest,
}

impl Display for AutoOffsetReset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AutoOffsetReset::Earliest => write!(f, "earliest"),
        }
    }
}

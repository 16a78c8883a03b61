use serde::Deserialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityProtocol {
    #[default]
    Plaintext,
    Ssl,
}

impl Display for SecurityProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityProtocol::Plaintext => write!(f, "plaintext"),
            SecurityProtocol::Ssl => write!(f, "ssl"),
        }
    }
}

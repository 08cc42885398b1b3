use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Indian stock exchange an instrument is listed on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    /// National Stock Exchange of India
    #[default]
    Nse,
    /// Bombay Stock Exchange
    Bse,
}

impl Exchange {
    pub const ALL: &'static [Exchange] = &[Exchange::Nse, Exchange::Bse];

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
        }
    }

    /// The other exchange. Most large caps are dual-listed.
    pub fn alternate(self) -> Self {
        match self {
            Exchange::Nse => Exchange::Bse,
            Exchange::Bse => Exchange::Nse,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown exchange: {0}")]
pub struct ParseExchangeError(pub String);

impl FromStr for Exchange {
    type Err = ParseExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NSE" | "NS" => Ok(Exchange::Nse),
            "BSE" | "BO" => Ok(Exchange::Bse),
            other => Err(ParseExchangeError(other.to_string())),
        }
    }
}

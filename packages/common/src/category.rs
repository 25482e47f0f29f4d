#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of challenge categories.
///
/// Serialized with the human-readable labels shown on the challenge board, and stored
/// under the same labels when the `sea-orm` feature is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Category {
    #[serde(rename = "Web Exploitation")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Web Exploitation"))]
    WebExploitation,
    #[serde(rename = "Cryptography")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Cryptography"))]
    Cryptography,
    #[serde(rename = "Forensics")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Forensics"))]
    Forensics,
    #[serde(rename = "Pwn")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pwn"))]
    Pwn,
    #[serde(rename = "Reverse Engineering")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Reverse Engineering"))]
    ReverseEngineering,
    #[serde(rename = "OSINT")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "OSINT"))]
    Osint,
    #[serde(rename = "Misc")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Misc"))]
    Misc,
    #[serde(rename = "Steganography")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Steganography"))]
    Steganography,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Self::WebExploitation,
        Self::Cryptography,
        Self::Forensics,
        Self::Pwn,
        Self::ReverseEngineering,
        Self::Osint,
        Self::Misc,
        Self::Steganography,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebExploitation => "Web Exploitation",
            Self::Cryptography => "Cryptography",
            Self::Forensics => "Forensics",
            Self::Pwn => "Pwn",
            Self::ReverseEngineering => "Reverse Engineering",
            Self::Osint => "OSINT",
            Self::Misc => "Misc",
            Self::Steganography => "Steganography",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown category label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid category '{invalid}'")]
pub struct ParseCategoryError {
    invalid: String,
}

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseCategoryError {
                invalid: s.to_string(),
            })
    }
}

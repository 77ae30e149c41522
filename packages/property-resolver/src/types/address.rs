//! Address input and its derived forms.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Trailing components recognised as a country and dropped from the
/// without-country form.
const COUNTRY_SUFFIXES: &[&str] = &["USA", "US", "U.S.A.", "UNITED STATES", "UNITED STATES OF AMERICA"];

/// How the caller produced the address text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressInputType {
    /// Picked from an autocomplete widget, usually ends with a country
    #[default]
    AutoComplete,
    /// Typed by hand
    FreeForm,
    /// An opaque place identifier from the geocoding provider
    ExactPlaceId,
    /// A listing title rather than a street address
    PropertyTitle,
}

impl fmt::Display for AddressInputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressInputType::AutoComplete => "AutoComplete",
            AddressInputType::FreeForm => "FreeForm",
            AddressInputType::ExactPlaceId => "ExactPlaceId",
            AddressInputType::PropertyTitle => "PropertyTitle",
        };
        f.write_str(name)
    }
}

impl FromStr for AddressInputType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "autocomplete" => Ok(AddressInputType::AutoComplete),
            "freeform" => Ok(AddressInputType::FreeForm),
            "exactplaceid" | "placeid" => Ok(AddressInputType::ExactPlaceId),
            "propertytitle" | "title" => Ok(AddressInputType::PropertyTitle),
            other => Err(ValidationError::UnknownInputType(other.to_string())),
        }
    }
}

/// A property address with every derived form computed up front.
///
/// Fields are private; an `Address` never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    input: String,
    input_type: AddressInputType,
    formatted: String,
    short_formatted: String,
    formatted_without_country: String,
    place_id: String,
    tenant: Option<String>,
}

impl Address {
    pub fn new(raw: &str, input_type: AddressInputType, tenant: Option<&str>) -> Self {
        let input = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let formatted = input.clone();

        let parts: Vec<&str> = formatted
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let short_formatted = if parts.len() >= 2 {
            parts[..2].join(", ")
        } else {
            formatted.clone()
        };

        let ends_with_country = parts.len() > 1
            && parts
                .last()
                .map(|last| COUNTRY_SUFFIXES.contains(&last.to_uppercase().as_str()))
                .unwrap_or(false);
        let formatted_without_country = if ends_with_country {
            parts[..parts.len() - 1].join(", ")
        } else {
            formatted.clone()
        };

        let place_id = match input_type {
            AddressInputType::ExactPlaceId => input.clone(),
            _ => Self::hash_place(&formatted),
        };

        Self {
            input,
            input_type,
            formatted,
            short_formatted,
            formatted_without_country,
            place_id,
            tenant: tenant.map(str::to_string),
        }
    }

    /// Stable identifier for a formatted address.
    pub fn hash_place(formatted: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(formatted.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_type(&self) -> AddressInputType {
        self.input_type
    }

    pub fn formatted(&self) -> &str {
        &self.formatted
    }

    /// First two comma-separated components ("street, city").
    pub fn short_formatted(&self) -> &str {
        &self.short_formatted
    }

    pub fn formatted_without_country(&self) -> &str {
        &self.formatted_without_country
    }

    pub fn place_id(&self) -> &str {
        &self.place_id
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// The street line (text before the first comma).
    pub fn street(&self) -> &str {
        self.formatted
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or(&self.formatted)
    }

    pub fn is_title(&self) -> bool {
        self.input_type == AddressInputType::PropertyTitle
    }

    /// See [`crate::normalize::plausible_matches`].
    pub fn plausible_matches(&self) -> Vec<String> {
        crate::normalize::plausible_matches(self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

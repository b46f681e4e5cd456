//! Catalog Model
//!
//! Only the slice of the catalog the ordering core reads: a drink, its
//! per-size prices and whether it can be ordered right now.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cup size offered for every drink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    Regular,
    Large,
}

impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Regular => "Regular",
            Size::Large => "Large",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a size string is not one of the offered sizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSize(pub String);

impl fmt::Display for UnknownSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown size: {}", self.0)
    }
}

impl std::error::Error for UnknownSize {}

impl FromStr for Size {
    type Err = UnknownSize;

    /// Case-insensitive, so "large" and "Large" both resolve.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(Size::Regular),
            "large" => Ok(Size::Large),
            _ => Err(UnknownSize(s.to_string())),
        }
    }
}

/// Product as exposed by the catalog reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price_regular: Decimal,
    pub price_large: Decimal,
    pub is_available: bool,
}

impl Product {
    /// Current catalog price for the given size
    pub fn price_for(&self, size: Size) -> Decimal {
        match size {
            Size::Regular => self.price_regular,
            Size::Large => self.price_large,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_size_parse_is_case_insensitive() {
        assert_eq!("Large".parse::<Size>(), Ok(Size::Large));
        assert_eq!("large".parse::<Size>(), Ok(Size::Large));
        assert_eq!(" regular ".parse::<Size>(), Ok(Size::Regular));
        assert!("Venti".parse::<Size>().is_err());
    }

    #[test]
    fn test_price_for_size() {
        let p = Product {
            id: 7,
            name: "Jasmine Milk Tea".into(),
            price_regular: dec!(6.90),
            price_large: dec!(8.50),
            is_available: true,
        };
        assert_eq!(p.price_for(Size::Regular), dec!(6.90));
        assert_eq!(p.price_for(Size::Large), dec!(8.50));
    }
}

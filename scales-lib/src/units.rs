use std::{fmt::Display, str::FromStr};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Gram,
    Kilogram,
    Pound,
    Ounce,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Gram, Unit::Kilogram, Unit::Pound, Unit::Ounce];

    pub fn grams(self) -> f64 {
        match self {
            Unit::Gram => 1.0,
            Unit::Kilogram => 1000.0,
            Unit::Pound => 453.592,
            Unit::Ounce => 28.3495,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Pound => "lb",
            Unit::Ounce => "oz",
        }
    }

    pub fn convert(self, value: f64, to: Unit) -> f64 {
        if self == to {
            value
        } else {
            value * self.grams() / to.grams()
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = ConfigurationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "g" | "gr" | "gram" => Ok(Unit::Gram),
            "kg" | "kilogram" => Ok(Unit::Kilogram),
            "lb" | "pound" => Ok(Unit::Pound),
            "oz" | "ounce" => Ok(Unit::Ounce),
            _ => Err(ConfigurationError::BadUnit(input.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Normal,
    Overload,
    Underload,
}

/// A validated scale reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub value: f64,
    pub unit: Unit,
    pub stable: bool,
    pub load: LoadState,
}

impl Weight {
    pub fn new(value: f64, unit: Unit, stable: bool) -> Self {
        Self {
            value,
            unit,
            stable,
            load: LoadState::Normal,
        }
    }

    pub fn with_load(self, load: LoadState) -> Self {
        Self { load, ..self }
    }

    pub fn to_unit(self, unit: Unit) -> Self {
        Self {
            value: self.unit.convert(self.value, unit),
            unit,
            ..self
        }
    }

    pub fn is_overload(&self) -> bool {
        self.load == LoadState::Overload
    }

    pub fn is_underload(&self) -> bool {
        self.load == LoadState::Underload
    }
}

impl Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match (self.load, self.stable) {
            (LoadState::Overload, _) => "overload",
            (LoadState::Underload, _) => "underload",
            (LoadState::Normal, true) => "stable",
            (LoadState::Normal, false) => "unstable",
        };
        write!(f, "{} {} ({})", self.value, self.unit, state)
    }
}

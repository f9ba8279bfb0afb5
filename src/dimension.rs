use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The physical dimension of a NeuroML quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    ConductanceDensity,
    Voltage,
    Resistivity,
    SpecificCapacitance,
    Concentration,
    Length,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::ConductanceDensity => "conductance density",
            Dimension::Voltage => "voltage",
            Dimension::Resistivity => "resistivity",
            Dimension::SpecificCapacitance => "specific capacitance",
            Dimension::Concentration => "concentration",
            Dimension::Length => "length",
        };
        f.write_str(name)
    }
}

/// The NeuroML units this crate reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    SiemensPerSquareCm,
    SiemensPerSquareM,
    MilliSiemensPerSquareCm,
    Volts,
    MilliVolts,
    OhmCm,
    KiloOhmCm,
    OhmM,
    MicroFaradsPerSquareCm,
    FaradsPerSquareM,
    MolPerCubicCm,
    MolPerCubicM,
    MilliMolar,
    Microns,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::SiemensPerSquareCm => "S_per_cm2",
            Unit::SiemensPerSquareM => "S_per_m2",
            Unit::MilliSiemensPerSquareCm => "mS_per_cm2",
            Unit::Volts => "V",
            Unit::MilliVolts => "mV",
            Unit::OhmCm => "ohm_cm",
            Unit::KiloOhmCm => "kohm_cm",
            Unit::OhmM => "ohm_m",
            Unit::MicroFaradsPerSquareCm => "uF_per_cm2",
            Unit::FaradsPerSquareM => "F_per_m2",
            Unit::MolPerCubicCm => "mol_per_cm3",
            Unit::MolPerCubicM => "mol_per_m3",
            Unit::MilliMolar => "mM",
            Unit::Microns => "um",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Unit> {
        let unit = match symbol {
            "S_per_cm2" => Unit::SiemensPerSquareCm,
            "S_per_m2" => Unit::SiemensPerSquareM,
            "mS_per_cm2" => Unit::MilliSiemensPerSquareCm,
            "V" => Unit::Volts,
            "mV" => Unit::MilliVolts,
            "ohm_cm" => Unit::OhmCm,
            "kohm_cm" => Unit::KiloOhmCm,
            "ohm_m" => Unit::OhmM,
            "uF_per_cm2" => Unit::MicroFaradsPerSquareCm,
            "F_per_m2" => Unit::FaradsPerSquareM,
            "mol_per_cm3" => Unit::MolPerCubicCm,
            "mol_per_m3" => Unit::MolPerCubicM,
            "mM" => Unit::MilliMolar,
            "um" => Unit::Microns,
            _ => return None,
        };
        Some(unit)
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::SiemensPerSquareCm | Unit::SiemensPerSquareM | Unit::MilliSiemensPerSquareCm => {
                Dimension::ConductanceDensity
            }
            Unit::Volts | Unit::MilliVolts => Dimension::Voltage,
            Unit::OhmCm | Unit::KiloOhmCm | Unit::OhmM => Dimension::Resistivity,
            Unit::MicroFaradsPerSquareCm | Unit::FaradsPerSquareM => {
                Dimension::SpecificCapacitance
            }
            Unit::MolPerCubicCm | Unit::MolPerCubicM | Unit::MilliMolar => {
                Dimension::Concentration
            }
            Unit::Microns => Dimension::Length,
        }
    }

    /// Factor converting a magnitude in this unit to the SI unit of its dimension.
    pub fn si_factor(&self) -> f64 {
        match self {
            Unit::SiemensPerSquareCm => 1e4,
            Unit::SiemensPerSquareM => 1.0,
            Unit::MilliSiemensPerSquareCm => 10.0,
            Unit::Volts => 1.0,
            Unit::MilliVolts => 1e-3,
            Unit::OhmCm => 1e-2,
            Unit::KiloOhmCm => 10.0,
            Unit::OhmM => 1.0,
            Unit::MicroFaradsPerSquareCm => 1e-2,
            Unit::FaradsPerSquareM => 1.0,
            Unit::MolPerCubicCm => 1e6,
            Unit::MolPerCubicM => 1.0,
            Unit::MilliMolar => 1.0,
            Unit::Microns => 1e-6,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum QuantityError {
    Malformed(String),
    UnknownUnit(String),
    WrongDimension { literal: String, expected: Dimension },
}

impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityError::Malformed(literal) => write!(f, "malformed quantity {literal:?}"),
            QuantityError::UnknownUnit(literal) => write!(f, "unknown unit in {literal:?}"),
            QuantityError::WrongDimension { literal, expected } => {
                write!(f, "{literal:?} is not a {expected}")
            }
        }
    }
}

impl std::error::Error for QuantityError {}

/// A physical literal such as `2.1 S_per_cm2` or `-80mV`.
///
/// The literal text is kept verbatim so that a written document carries
/// exactly what was supplied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity {
    literal: String,
    magnitude: f64,
    unit: Unit,
}

impl Quantity {
    /// Parse a literal and require it to be of the given dimension.
    pub fn of(literal: &str, expected: Dimension) -> Result<Quantity, QuantityError> {
        let quantity: Quantity = literal.parse()?;
        if quantity.unit.dimension() != expected {
            return Err(QuantityError::WrongDimension {
                literal: literal.to_string(),
                expected,
            });
        }
        Ok(quantity)
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }
}

/// Split `-84.395 mV` or `5.0E-11mol_per_cm3` into magnitude and unit text.
fn split_literal(literal: &str) -> Option<(&str, &str)> {
    let trimmed = literal.trim();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    while end < bytes.len() {
        let c = bytes[end];
        let exponent = (c == b'e' || c == b'E')
            && end > 0
            && bytes
                .get(end + 1)
                .map_or(false, |n| n.is_ascii_digit() || *n == b'-' || *n == b'+');
        if c.is_ascii_digit() || c == b'.' || c == b'-' || c == b'+' || exponent {
            if exponent {
                end += 1;
            }
            end += 1;
        } else {
            break;
        }
    }
    if end == 0 {
        return None;
    }
    Some((&trimmed[..end], trimmed[end..].trim()))
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        let (number, symbol) =
            split_literal(literal).ok_or_else(|| QuantityError::Malformed(literal.to_string()))?;
        let magnitude = number
            .parse::<f64>()
            .map_err(|_| QuantityError::Malformed(literal.to_string()))?;
        let unit = Unit::from_symbol(symbol)
            .ok_or_else(|| QuantityError::UnknownUnit(literal.to_string()))?;
        Ok(Quantity {
            literal: literal.to_string(),
            magnitude,
            unit,
        })
    }
}

impl TryFrom<String> for Quantity {
    type Error = QuantityError;

    fn try_from(literal: String) -> Result<Self, Self::Error> {
        literal.parse()
    }
}

impl From<Quantity> for String {
    fn from(quantity: Quantity) -> String {
        quantity.literal
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// Path length along the neurite, in microns.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Microns(pub f64);

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SiemensPerSquareM(pub f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spaced_and_unspaced_literals() {
        let g = Quantity::of("2.1 S_per_cm2", Dimension::ConductanceDensity).unwrap();
        assert_eq!(g.magnitude(), 2.1);
        assert_eq!(g.unit(), Unit::SiemensPerSquareCm);
        assert_eq!(g.to_string(), "2.1 S_per_cm2");

        let v = Quantity::of("-80mV", Dimension::Voltage).unwrap();
        assert_eq!(v.magnitude(), -80.0);
        assert_eq!(v.literal(), "-80mV");
    }

    #[test]
    fn parses_exponents() {
        let g: Quantity = "5.135E-05 S_per_cm2".parse().unwrap();
        assert_eq!(g.magnitude(), 5.135e-5);
        let c: Quantity = "5.0E-11mol_per_cm3".parse().unwrap();
        assert_eq!(c.unit(), Unit::MolPerCubicCm);
        assert_eq!(c.magnitude(), 5.0e-11);
    }

    #[test]
    fn rejects_wrong_dimension() {
        let err = Quantity::of("50 mV", Dimension::ConductanceDensity).unwrap_err();
        assert_eq!(
            err,
            QuantityError::WrongDimension {
                literal: "50 mV".to_string(),
                expected: Dimension::ConductanceDensity
            }
        );
    }

    #[test]
    fn rejects_unknown_units_and_garbage() {
        assert!(matches!(
            "3 furlongs".parse::<Quantity>(),
            Err(QuantityError::UnknownUnit(_))
        ));
        assert!(matches!(
            "S_per_cm2".parse::<Quantity>(),
            Err(QuantityError::Malformed(_))
        ));
    }

    #[test]
    fn converts_to_si() {
        let g: Quantity = "1.87E-4 S_per_cm2".parse().unwrap();
        assert!((g.magnitude() * g.unit().si_factor() - 1.87).abs() < 1e-12);
        let r: Quantity = "0.49573 kohm_cm".parse().unwrap();
        assert!((r.magnitude() * r.unit().si_factor() - 4.9573).abs() < 1e-12);
    }
}

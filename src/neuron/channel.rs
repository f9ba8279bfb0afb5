use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::PATH_LENGTH_VARIABLE;
use crate::dimension::{Microns, Quantity, SiemensPerSquareM, Unit};

/// The ion a channel conducts, using NeuroML's species names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ion {
    Na,
    K,
    Ca,
    Hcn,
    NonSpecific,
}

impl Ion {
    pub fn name(&self) -> &'static str {
        match self {
            Ion::Na => "na",
            Ion::K => "k",
            Ion::Ca => "ca",
            Ion::Hcn => "hcn",
            Ion::NonSpecific => "non_specific",
        }
    }

    pub fn from_name(name: &str) -> Option<Ion> {
        match name {
            "na" => Some(Ion::Na),
            "k" => Some(Ion::K),
            "ca" => Some(Ion::Ca),
            "hcn" => Some(Ion::Hcn),
            "non_specific" => Some(Ion::NonSpecific),
            _ => None,
        }
    }
}

impl fmt::Display for Ion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A uniform channel density with a fixed reversal potential.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelDensity {
    pub id: String,
    pub ion_channel: String,
    pub cond_density: Quantity,
    pub erev: Quantity,
    pub segment_group: String,
    pub ion: Ion,
}

/// A uniform channel density whose reversal potential the simulator
/// derives from the ion concentrations.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelDensityNernst {
    pub id: String,
    pub ion_channel: String,
    pub cond_density: Quantity,
    pub segment_group: String,
    pub ion: Ion,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InhomogeneousValue {
    pub inhomogeneous_parameter: String,
    /// Expression in the parameter's variable, kept as an opaque string.
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableParameter {
    pub parameter: String,
    pub segment_group: String,
    pub inhomogeneous_value: InhomogeneousValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelDensityNonUniform {
    pub id: String,
    pub ion_channel: String,
    pub erev: Quantity,
    pub ion: Ion,
    pub variable_parameters: Vec<VariableParameter>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelDensityNonUniformNernst {
    pub id: String,
    pub ion_channel: String,
    pub ion: Ion,
    pub variable_parameters: Vec<VariableParameter>,
}

/// Heaviside step: 1 for non-negative arguments, 0 otherwise.
pub fn heaviside(x: f64) -> f64 {
    if x >= 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Closed-form conductance density as a function of path length `p`
/// (microns from the root). Evaluates to S/m2.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DensityProfile {
    /// `scale * (amplitude * exp(rate * p / 1000) + offset)`
    Exponential {
        scale: f64,
        amplitude: f64,
        rate: f64,
        offset: f64,
    },
    /// `baseline` outside `[start, end]`, `baseline * boost` inside. The
    /// baseline is in S/cm2 and converted in the expression.
    Band {
        baseline: f64,
        boost: f64,
        start: f64,
        end: f64,
    },
}

fn per_cm2() -> f64 {
    Unit::SiemensPerSquareCm.si_factor()
}

impl DensityProfile {
    pub fn evaluate(&self, p: Microns) -> SiemensPerSquareM {
        let p = p.0;
        let g = match *self {
            DensityProfile::Exponential { scale, amplitude, rate, offset } => {
                scale * (amplitude * (rate * p / 1000.0).exp() + offset)
            }
            DensityProfile::Band { baseline, boost, start, end } => {
                let step = heaviside(p - start) * heaviside(end - p);
                per_cm2() * baseline * (1.0 + (boost - 1.0) * step)
            }
        };
        SiemensPerSquareM(g)
    }

    /// The expression handed to the simulator exporter.
    pub fn expression(&self) -> String {
        let p = PATH_LENGTH_VARIABLE;
        match *self {
            DensityProfile::Exponential { scale, amplitude, rate, offset } => {
                let (sign, offset) = if offset < 0.0 { ('-', -offset) } else { ('+', offset) };
                format!("{scale:E} * ({amplitude} * exp({rate} * {p} / 1000) {sign} {offset})")
            }
            DensityProfile::Band { baseline, boost, start, end } => {
                format!(
                    "{:E} * {baseline:E} * (1 + {} * H({p} - {start}) * H({end} - {p}))",
                    per_cm2(),
                    boost - 1.0
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ih() -> DensityProfile {
        DensityProfile::Exponential {
            scale: 0.5135,
            amplitude: 2.087,
            rate: 3.6161,
            offset: -0.8696,
        }
    }

    fn lva() -> DensityProfile {
        DensityProfile::Band { baseline: 1.87E-4, boost: 100.0, start: 360.0, end: 600.0 }
    }

    // 1.87E-4 S/cm2 in S/m2
    const LVA_BASELINE: f64 = 1e4 * 1.87E-4;

    #[test]
    fn ih_expression_and_origin_value() {
        assert_eq!(ih().expression(), "5.135E-1 * (2.087 * exp(3.6161 * p / 1000) - 0.8696)");
        let g = ih().evaluate(Microns(0.0)).0;
        assert!((g - 0.5135 * (2.087 - 0.8696)).abs() < 1e-12);
        assert!((g - 0.625).abs() < 1e-3);
    }

    #[test]
    fn band_expression() {
        assert_eq!(
            lva().expression(),
            "1E4 * 1.87E-4 * (1 + 99 * H(p - 360) * H(600 - p))"
        );
    }

    #[test]
    fn band_boosts_only_inside() {
        let baseline = LVA_BASELINE;
        assert_eq!(lva().evaluate(Microns(400.0)).0, baseline * 100.0);
        assert_eq!(lva().evaluate(Microns(300.0)).0, baseline);
        assert_eq!(lva().evaluate(Microns(700.0)).0, baseline);
    }

    #[test]
    fn band_edges_are_inside() {
        assert_eq!(lva().evaluate(Microns(360.0)).0, LVA_BASELINE * 100.0);
        assert_eq!(lva().evaluate(Microns(600.0)).0, LVA_BASELINE * 100.0);
        assert_eq!(lva().evaluate(Microns(359.999)).0, LVA_BASELINE);
        assert_eq!(lva().evaluate(Microns(600.001)).0, LVA_BASELINE);
        assert!((LVA_BASELINE - 1.87).abs() < 1e-12);
    }

    #[test]
    fn heaviside_convention() {
        assert_eq!(heaviside(0.0), 1.0);
        assert_eq!(heaviside(-0.0), 1.0);
        assert_eq!(heaviside(-1e-9), 0.0);
    }

    proptest! {
        #[test]
        fn ih_grows_monotonically(p in 0.0f64..2000.0, dp in 1e-3f64..500.0) {
            prop_assert!(ih().evaluate(Microns(p + dp)).0 > ih().evaluate(Microns(p)).0);
        }

        #[test]
        fn hva_band_is_tenfold(p in 0.0f64..1500.0) {
            let hva =
                DensityProfile::Band { baseline: 5.55E-5, boost: 10.0, start: 360.0, end: 600.0 };
            let baseline = 1e4 * 5.55E-5;
            let g = hva.evaluate(Microns(p)).0;
            if (360.0..=600.0).contains(&p) {
                prop_assert_eq!(g, baseline * 10.0);
            } else {
                prop_assert_eq!(g, baseline);
            }
        }
    }
}

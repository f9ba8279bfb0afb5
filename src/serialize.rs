use serde::{Deserialize, Serialize};

use crate::classify::Region;
use crate::neuron::channel::{DensityProfile, Ion};

/// A named catalogue of passive properties and channel densities, one per
/// model variant. Values are NeuroML literals and are checked when attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub name: String,
    /// Appended to the cell's notes.
    #[serde(default)]
    pub reference: Option<String>,
    /// Extra documents to include, such as concentration models.
    #[serde(default)]
    pub includes: Vec<String>,
    pub passive: PassiveProperties,
    #[serde(default)]
    pub uniform: Vec<UniformDensity>,
    #[serde(default)]
    pub species: Vec<SpeciesParameters>,
    #[serde(default)]
    pub non_uniform: Vec<NonUniformDensity>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassiveProperties {
    pub resistivity: String,
    pub specific_capacitance: String,
    pub init_memb_potential: String,
    #[serde(default)]
    pub capacitance_overrides: Vec<RegionValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionValue {
    pub region: Region,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformDensity {
    /// Defaults to `<ion_channel>_<region adjective>`.
    #[serde(default)]
    pub id: Option<String>,
    pub region: Region,
    pub ion_channel: String,
    pub ion: Ion,
    pub cond_density: String,
    /// `None` means the reversal potential follows the Nernst equation.
    #[serde(default)]
    pub erev: Option<String>,
    /// Defaults to `channels/<ion_channel>.channel.nml`.
    #[serde(default)]
    pub channel_file: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParameters {
    pub id: String,
    pub region: Region,
    pub ion: Ion,
    pub concentration_model: String,
    pub initial_concentration: String,
    pub initial_ext_concentration: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonUniformDensity {
    #[serde(default)]
    pub id: Option<String>,
    pub region: Region,
    pub ion_channel: String,
    pub ion: Ion,
    #[serde(default)]
    pub erev: Option<String>,
    pub profile: DensityProfile,
    #[serde(default)]
    pub channel_file: Option<String>,
}

pub fn default_channel_file(ion_channel: &str) -> String {
    format!("channels/{ion_channel}.channel.nml")
}

pub fn default_density_id(ion_channel: &str, region: Region) -> String {
    format!("{ion_channel}_{}", region.adjective())
}

impl UniformDensity {
    pub fn density_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| default_density_id(&self.ion_channel, self.region))
    }

    pub fn channel_file(&self) -> String {
        self.channel_file
            .clone()
            .unwrap_or_else(|| default_channel_file(&self.ion_channel))
    }
}

impl NonUniformDensity {
    pub fn density_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| default_density_id(&self.ion_channel, self.region))
    }

    pub fn channel_file(&self) -> String {
        self.channel_file
            .clone()
            .unwrap_or_else(|| default_channel_file(&self.ion_channel))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn uniform_defaults() {
        let d: UniformDensity = serde_json::from_str(
            r#"{"region": "soma", "ion_channel": "NaTa_t", "ion": "na",
                "cond_density": "2.1 S_per_cm2", "erev": "50 mV"}"#,
        )
        .unwrap();
        assert_eq!(d.density_id(), "NaTa_t_somatic");
        assert_eq!(d.channel_file(), "channels/NaTa_t.channel.nml");
    }

    #[test]
    fn nernst_density_has_no_erev() {
        let d: UniformDensity = serde_json::from_str(
            r#"{"region": "axon", "ion_channel": "Ca_HVA", "ion": "ca",
                "cond_density": "0.00069 S_per_cm2"}"#,
        )
        .unwrap();
        assert_eq!(d.erev, None);
        assert_eq!(d.density_id(), "Ca_HVA_axonal");
    }

    #[test]
    fn profile_is_tagged() {
        let d: NonUniformDensity = serde_json::from_str(
            r#"{"region": "apical", "ion_channel": "Ca_HVA", "ion": "ca",
                "profile": {"type": "band", "baseline": 5.55E-5, "boost": 10.0,
                            "start": 360.0, "end": 600.0}}"#,
        )
        .unwrap();
        assert_eq!(
            d.profile,
            DensityProfile::Band { baseline: 5.55E-5, boost: 10.0, start: 360.0, end: 600.0 }
        );
        assert_eq!(d.density_id(), "Ca_HVA_apical");
    }
}

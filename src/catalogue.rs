use crate::classify::Region;
use crate::neuron::channel::{DensityProfile, Ion};
use crate::serialize::{
    NonUniformDensity, ParameterSet, PassiveProperties, RegionValue, SpeciesParameters,
    UniformDensity,
};

pub const BUILTIN_NAMES: [&str; 3] = ["somatic", "full", "full-ek77"];

pub const REFERENCE: &str = ". Reference: Scott Rich, Homeira Moradi Chameh, Vladislav Sekulic, Taufik A Valiante, Frances K Skinner, Modeling Reveals Human-Rodent Differences in H-Current Kinetics Influencing Resonance in Cortical Layer 5 Neurons, Cerebral Cortex, Volume 31, Issue 2, February 2021, Pages 845-872, https://doi.org/10.1093/cercor/bhaa261";

const ENA: &str = "50 mV";
const EH: &str = "-45 mV";
const CA_INTERNAL: &str = "5.0E-11 mol_per_cm3";
const CA_EXTERNAL: &str = "2.0E-6 mol_per_cm3";

pub fn builtin(name: &str) -> Option<ParameterSet> {
    match name {
        "somatic" => Some(somatic()),
        "full" => Some(full()),
        "full-ek77" => Some(full_ek77()),
        _ => None,
    }
}

/// Passive membrane plus somatic channels only.
pub fn somatic() -> ParameterSet {
    let mut densities = vec![pas()];
    densities.extend(soma_channels("-85 mV"));
    ParameterSet {
        name: "somatic".to_string(),
        reference: Some(REFERENCE.to_string()),
        includes: concentration_models(),
        passive: passive(),
        uniform: densities,
        species: vec![ca_species(Region::Soma, "CaDynamics_E2_NML2__decay460__gamma5_01Emin4")],
        non_uniform: vec![],
    }
}

/// Every region, potassium reversal at -85 mV.
pub fn full() -> ParameterSet {
    all_regions("full", "-85 mV")
}

/// Every region, potassium reversal at -77 mV.
pub fn full_ek77() -> ParameterSet {
    all_regions("full-ek77", "-77 mV")
}

fn all_regions(name: &str, ek: &str) -> ParameterSet {
    let mut densities = vec![pas()];
    densities.extend(soma_channels(ek));
    densities.extend(axon_channels(ek));
    densities.extend(apical_channels(ek));
    densities.extend(basal_channels());
    ParameterSet {
        name: name.to_string(),
        reference: Some(REFERENCE.to_string()),
        includes: concentration_models(),
        passive: passive(),
        uniform: densities,
        species: vec![
            ca_species(Region::Soma, "CaDynamics_E2_NML2__decay460__gamma5_01Emin4"),
            ca_species(Region::Axon, "CaDynamics_E2_NML2"),
            ca_species(Region::Apical, "CaDynamics_E2_NML2__decay122__gamma5_09Emin4"),
        ],
        non_uniform: apical_gradients(),
    }
}

fn concentration_models() -> Vec<String> {
    vec![
        "channels/CaDynamics_E2_NML2.nml".to_string(),
        "channels/CaDynamics_E2_NML2__decay460__gamma5_01Emin4.nml".to_string(),
        "channels/CaDynamics_E2_NML2__decay122__gamma5_09Emin4.nml".to_string(),
    ]
}

fn passive() -> PassiveProperties {
    PassiveProperties {
        resistivity: "0.49573 kohm_cm".to_string(),
        specific_capacitance: "1.5967 uF_per_cm2".to_string(),
        init_memb_potential: "-80mV".to_string(),
        capacitance_overrides: vec![RegionValue {
            region: Region::Soma,
            value: "1 uF_per_cm2".to_string(),
        }],
    }
}

fn uniform(
    region: Region,
    ion_channel: &str,
    ion: Ion,
    g: &str,
    erev: Option<&str>,
) -> UniformDensity {
    UniformDensity {
        id: None,
        region,
        ion_channel: ion_channel.to_string(),
        ion,
        cond_density: g.to_string(),
        erev: erev.map(str::to_string),
        channel_file: None,
    }
}

fn pas() -> UniformDensity {
    UniformDensity {
        id: Some("pas".to_string()),
        ..uniform(Region::All, "pas", Ion::NonSpecific, "1.75E-5 S_per_cm2", Some("-84.395 mV"))
    }
}

fn ca_species(region: Region, concentration_model: &str) -> SpeciesParameters {
    SpeciesParameters {
        id: "ca".to_string(),
        region,
        ion: Ion::Ca,
        concentration_model: concentration_model.to_string(),
        initial_concentration: CA_INTERNAL.to_string(),
        initial_ext_concentration: CA_EXTERNAL.to_string(),
    }
}

fn soma_channels(ek: &str) -> Vec<UniformDensity> {
    let r = Region::Soma;
    vec![
        uniform(r, "SK_E2", Ion::K, "2.4536e-09 S_per_cm2", Some(ek)),
        uniform(r, "SKv3_1", Ion::K, "0.04 S_per_cm2", Some(ek)),
        uniform(r, "K_Tst", Ion::K, "2e-05 S_per_cm2", Some(ek)),
        uniform(r, "K_Pst", Ion::K, "0.065 S_per_cm2", Some(ek)),
        uniform(r, "Ih", Ion::Hcn, "5.135E-05 S_per_cm2", Some(EH)),
        uniform(r, "NaTa_t", Ion::Na, "2.1 S_per_cm2", Some(ENA)),
        uniform(r, "Nap_Et2", Ion::Na, "1E-6 S_per_cm2", Some(ENA)),
        uniform(r, "Ca_HVA", Ion::Ca, "5.6938e-09 S_per_cm2", None),
        uniform(r, "Ca_LVAst", Ion::Ca, "0.00099839 S_per_cm2", None),
    ]
}

fn axon_channels(ek: &str) -> Vec<UniformDensity> {
    let r = Region::Axon;
    vec![
        uniform(r, "NaTa_t", Ion::Na, "3.137 S_per_cm2", Some(ENA)),
        uniform(r, "Nap_Et2", Ion::Na, "0.0063 S_per_cm2", Some(ENA)),
        uniform(r, "K_Pst", Ion::K, "0.973 S_per_cm2", Some(ek)),
        uniform(r, "K_Tst", Ion::K, "0.089 S_per_cm2", Some(ek)),
        uniform(r, "SKv3_1", Ion::K, "1.0 S_per_cm2", Some(ek)),
        uniform(r, "SK_E2", Ion::K, "0.0071 S_per_cm2", Some(ek)),
        uniform(r, "Ca_HVA", Ion::Ca, "0.00069 S_per_cm2", None),
        uniform(r, "Ca_LVAst", Ion::Ca, "0.0009 S_per_cm2", None),
    ]
}

fn apical_channels(ek: &str) -> Vec<UniformDensity> {
    let r = Region::Apical;
    vec![
        uniform(r, "SK_E2", Ion::K, "0.0012 S_per_cm2", Some(ek)),
        uniform(r, "SKv3_1", Ion::K, "0.000261 S_per_cm2", Some(ek)),
        uniform(r, "NaTa_t", Ion::Na, "0.0213 S_per_cm2", Some(ENA)),
        uniform(r, "Im", Ion::K, "6.75E-05 S_per_cm2", Some(ek)),
    ]
}

fn basal_channels() -> Vec<UniformDensity> {
    vec![uniform(Region::Basal, "Ih", Ion::Hcn, "5.135E-05 S_per_cm2", Some(EH))]
}

/// Path-length dependent densities of the apical dendrite. Ih is in S/m2,
/// the calcium band baselines in S/cm2.
fn apical_gradients() -> Vec<NonUniformDensity> {
    let band = |baseline, boost| DensityProfile::Band { baseline, boost, start: 360.0, end: 600.0 };
    vec![
        NonUniformDensity {
            id: None,
            region: Region::Apical,
            ion_channel: "Ih".to_string(),
            ion: Ion::Hcn,
            erev: Some(EH.to_string()),
            profile: DensityProfile::Exponential {
                scale: 5.135E-1,
                amplitude: 2.087,
                rate: 3.6161,
                offset: -0.8696,
            },
            channel_file: None,
        },
        NonUniformDensity {
            id: None,
            region: Region::Apical,
            ion_channel: "Ca_LVAst".to_string(),
            ion: Ion::Ca,
            erev: None,
            profile: band(1.87E-4, 100.0),
            channel_file: None,
        },
        NonUniformDensity {
            id: None,
            region: Region::Apical,
            ion_channel: "Ca_HVA".to_string(),
            ion: Ion::Ca,
            erev: None,
            profile: band(5.55E-5, 10.0),
            channel_file: None,
        },
    ]
}

use crate::dimension::Quantity;
use crate::neuron::channel::{
    ChannelDensity, ChannelDensityNernst, ChannelDensityNonUniform, ChannelDensityNonUniformNernst,
    Ion,
};

/// A scalar property bound to one segment group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupValue {
    pub value: Quantity,
    pub segment_group: String,
}

/// Membrane side of a cell's biophysics. Channel densities are kept per
/// kind so that they serialize in schema order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MembraneProperties {
    pub channel_densities: Vec<ChannelDensity>,
    pub channel_density_nernsts: Vec<ChannelDensityNernst>,
    pub channel_density_non_uniforms: Vec<ChannelDensityNonUniform>,
    pub channel_density_non_uniform_nernsts: Vec<ChannelDensityNonUniformNernst>,
    pub spike_threshes: Vec<GroupValue>,
    pub specific_capacitances: Vec<GroupValue>,
    pub init_memb_potentials: Vec<GroupValue>,
}

impl MembraneProperties {
    /// Ids of every channel density, of any kind.
    pub fn density_ids(&self) -> impl Iterator<Item = &str> {
        self.channel_densities
            .iter()
            .map(|d| d.id.as_str())
            .chain(self.channel_density_nernsts.iter().map(|d| d.id.as_str()))
            .chain(self.channel_density_non_uniforms.iter().map(|d| d.id.as_str()))
            .chain(self.channel_density_non_uniform_nernsts.iter().map(|d| d.id.as_str()))
    }

    pub fn channel_density(&self, id: &str) -> Option<&ChannelDensity> {
        self.channel_densities.iter().find(|d| d.id == id)
    }

    pub fn channel_density_nernst(&self, id: &str) -> Option<&ChannelDensityNernst> {
        self.channel_density_nernsts.iter().find(|d| d.id == id)
    }
}

/// An ion pool inside the cell, driven by a concentration model.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    pub id: String,
    pub concentration_model: String,
    pub ion: Ion,
    pub initial_concentration: Quantity,
    pub initial_ext_concentration: Quantity,
    pub segment_group: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntracellularProperties {
    pub species: Vec<Species>,
    pub resistivities: Vec<GroupValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BiophysicalProperties {
    pub id: String,
    pub membrane_properties: MembraneProperties,
    pub intracellular_properties: IntracellularProperties,
}

impl BiophysicalProperties {
    pub fn new(id: &str) -> Self {
        BiophysicalProperties {
            id: id.to_string(),
            membrane_properties: MembraneProperties::default(),
            intracellular_properties: IntracellularProperties::default(),
        }
    }
}

/// Set the value for a group, replacing any earlier value on that group.
pub fn set_group_value(values: &mut Vec<GroupValue>, value: Quantity, segment_group: &str) {
    match values.iter_mut().find(|v| v.segment_group == segment_group) {
        Some(existing) => existing.value = value,
        None => values.push(GroupValue {
            value,
            segment_group: segment_group.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_group_value_replaces_per_group() {
        let mut values = vec![];
        set_group_value(&mut values, "1.5967 uF_per_cm2".parse().unwrap(), "all");
        set_group_value(&mut values, "1 uF_per_cm2".parse().unwrap(), "soma_group");
        set_group_value(&mut values, "2 uF_per_cm2".parse().unwrap(), "all");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value.literal(), "2 uF_per_cm2");
        assert_eq!(values[1].segment_group, "soma_group");
    }
}

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::classify::{classify, AnatomyTables, Region};
use crate::constants::{CELL_SUFFIX, MORPHOLOGY_SUFFIX, PATH_LENGTH_METRIC, PATH_LENGTH_VARIABLE};
use crate::dimension::{Dimension, Microns, Quantity};
use crate::error::{AssemblyError, Result};
use crate::integrations::nml_file;
use crate::neuron::channel::{
    ChannelDensity, ChannelDensityNernst, ChannelDensityNonUniform, ChannelDensityNonUniformNernst,
    DensityProfile, InhomogeneousValue, VariableParameter,
};
use crate::neuron::membrane::{set_group_value, Species};
use crate::neuron::segment::InhomogeneousParameter;
use crate::neuron::{Cell, Document};
use crate::serialize::{
    NonUniformDensity, ParameterSet, PassiveProperties, SpeciesParameters, UniformDensity,
};

pub fn morphology_file(cell_name: &str) -> String {
    format!("{cell_name}{MORPHOLOGY_SUFFIX}")
}

pub fn cell_file(cell_name: &str) -> String {
    format!("{cell_name}{CELL_SUFFIX}")
}

/// Read `<cell>.morph.cell.nml` from `input_dir`, assemble it, and write
/// `<cell>.cell.nml` to `output_dir`. Returns the written path.
pub fn assemble(
    cell_name: &str,
    input_dir: &Path,
    output_dir: &Path,
    tables: &AnatomyTables,
    parameters: &ParameterSet,
) -> Result<PathBuf> {
    let input = input_dir.join(morphology_file(cell_name));
    info!("Loading {}", input.display());
    let mut document = nml_file::read_file(&input)?;
    post_process_cell(&mut document, cell_name, tables, parameters)?;
    let output = output_dir.join(cell_file(cell_name));
    info!("Writing {}", output.display());
    nml_file::write_file(&document, &output)?;
    Ok(output)
}

/// Turn a morphology-only document into a complete cell model in place.
pub fn post_process_cell(
    document: &mut Document,
    cell_name: &str,
    tables: &AnatomyTables,
    parameters: &ParameterSet,
) -> Result<()> {
    tables.validate()?;
    {
        let cell = document.cell_mut()?;
        cell.id = cell_name.to_string();
        if let Some(reference) = &parameters.reference {
            cell.append_notes(reference);
        }
        classify(cell, tables)?;
    }

    info!(parameters = %parameters.name, "Adding biophysics");
    for href in parameters.includes.iter() {
        document.add_include(href);
    }
    attach_passive(document.cell_mut()?, &parameters.passive)?;
    for density in parameters.uniform.iter() {
        attach_uniform(document, density)?;
    }
    for species in parameters.species.iter() {
        attach_species(document.cell_mut()?, species)?;
    }
    for density in parameters.non_uniform.iter() {
        attach_non_uniform(document, density)?;
    }
    Ok(())
}

fn checked(literal: &str, dimension: Dimension, context: &str) -> Result<Quantity> {
    Quantity::of(literal, dimension).map_err(|source| AssemblyError::InvalidQuantity {
        context: context.to_string(),
        source,
    })
}

fn require_group(cell: &Cell, group: &str) -> Result<()> {
    match cell.morphology.segment_group(group) {
        Some(_) => Ok(()),
        None => Err(AssemblyError::UnknownSegmentGroup(group.to_string())),
    }
}

fn require_unique(cell: &Cell, id: &str) -> Result<()> {
    let taken = cell
        .biophysical_properties
        .as_ref()
        .map_or(false, |b| b.membrane_properties.density_ids().any(|d| d == id));
    if taken {
        return Err(AssemblyError::DuplicateId(id.to_string()));
    }
    Ok(())
}

/// Resistivity, specific capacitance and initial potential on `all`, plus
/// per-region capacitance overrides.
pub fn attach_passive(cell: &mut Cell, passive: &PassiveProperties) -> Result<()> {
    let all = Region::All.group_id();
    require_group(cell, all)?;
    let resistivity = checked(&passive.resistivity, Dimension::Resistivity, "resistivity")?;
    let capacitance = checked(
        &passive.specific_capacitance,
        Dimension::SpecificCapacitance,
        "specific capacitance",
    )?;
    let potential = checked(
        &passive.init_memb_potential,
        Dimension::Voltage,
        "initial membrane potential",
    )?;
    let mut overrides = vec![];
    for o in passive.capacitance_overrides.iter() {
        require_group(cell, o.region.group_id())?;
        let value = checked(&o.value, Dimension::SpecificCapacitance, o.region.group_id())?;
        overrides.push((value, o.region.group_id()));
    }

    let biophysics = cell.biophysics_mut();
    let intracellular = &mut biophysics.intracellular_properties;
    set_group_value(&mut intracellular.resistivities, resistivity, all);
    let membrane = &mut biophysics.membrane_properties;
    set_group_value(&mut membrane.specific_capacitances, capacitance, all);
    set_group_value(&mut membrane.init_memb_potentials, potential, all);
    for (value, group) in overrides {
        debug!(group, capacitance = %value, "capacitance override");
        set_group_value(&mut membrane.specific_capacitances, value, group);
    }
    Ok(())
}

/// Attach a uniform density and register its channel file.
pub fn attach_uniform(document: &mut Document, density: &UniformDensity) -> Result<()> {
    let id = density.density_id();
    let group = density.region.group_id();
    let cell = document.cell_mut()?;
    require_group(cell, group)?;
    require_unique(cell, &id)?;
    let cond_density = checked(&density.cond_density, Dimension::ConductanceDensity, &id)?;
    let membrane = &mut cell.biophysics_mut().membrane_properties;
    match &density.erev {
        Some(erev) => {
            let erev = checked(erev, Dimension::Voltage, &id)?;
            debug!(%id, %group, %cond_density, %erev, "channel density");
            membrane.channel_densities.push(ChannelDensity {
                id,
                ion_channel: density.ion_channel.clone(),
                cond_density,
                erev,
                segment_group: group.to_string(),
                ion: density.ion,
            });
        }
        None => {
            debug!(%id, %group, %cond_density, "nernst channel density");
            membrane.channel_density_nernsts.push(ChannelDensityNernst {
                id,
                ion_channel: density.ion_channel.clone(),
                cond_density,
                segment_group: group.to_string(),
                ion: density.ion,
            });
        }
    }
    document.add_include(&density.channel_file());
    Ok(())
}

pub fn attach_species(cell: &mut Cell, species: &SpeciesParameters) -> Result<()> {
    let group = species.region.group_id();
    require_group(cell, group)?;
    let context = format!("species {} on {group}", species.id);
    let initial_concentration =
        checked(&species.initial_concentration, Dimension::Concentration, &context)?;
    let initial_ext_concentration =
        checked(&species.initial_ext_concentration, Dimension::Concentration, &context)?;
    cell.biophysics_mut().intracellular_properties.species.push(Species {
        id: species.id.clone(),
        concentration_model: species.concentration_model.clone(),
        ion: species.ion,
        initial_concentration,
        initial_ext_concentration,
        segment_group: group.to_string(),
    });
    Ok(())
}

pub fn path_length_parameter_id(group: &str) -> String {
    format!("PathLengthOver_{group}")
}

/// Define path length from the root over a region's group, once.
pub fn add_path_length_parameter(cell: &mut Cell, region: Region) -> Result<String> {
    let group = cell.morphology.require_group_mut(region.group_id())?;
    let id = path_length_parameter_id(&group.id);
    if !group.inhomogeneous_parameters.iter().any(|p| p.id == id) {
        group.inhomogeneous_parameters.push(InhomogeneousParameter {
            id: id.clone(),
            variable: PATH_LENGTH_VARIABLE.to_string(),
            metric: PATH_LENGTH_METRIC.to_string(),
            proximal_translation_start: Some(0.0),
            distal_normalization_end: None,
        });
    }
    Ok(id)
}

/// The lowest and highest density a profile takes over a region, in S/m2.
pub fn profile_range(
    cell: &Cell,
    region: Region,
    profile: &DensityProfile,
) -> Result<Option<(f64, f64)>> {
    let members = cell.morphology.resolve_members(region.group_id())?;
    let lengths = cell.morphology.path_lengths();
    let values = members
        .iter()
        .filter_map(|id| lengths.get(id))
        .map(|p| profile.evaluate(Microns(*p)).0);
    Ok(values.fold(None, |range, g| match range {
        None => Some((g, g)),
        Some((lo, hi)) => Some((lo.min(g), hi.max(g))),
    }))
}

/// Attach a path-length dependent density and register its channel file.
pub fn attach_non_uniform(document: &mut Document, density: &NonUniformDensity) -> Result<()> {
    let id = density.density_id();
    let cell = document.cell_mut()?;
    require_unique(cell, &id)?;
    let parameter = add_path_length_parameter(cell, density.region)?;
    if let Some((lo, hi)) = profile_range(cell, density.region, &density.profile)? {
        debug!(%id, lo, hi, "non-uniform density range over segments (S/m2)");
    }
    let variable_parameters = vec![VariableParameter {
        parameter: "condDensity".to_string(),
        segment_group: density.region.group_id().to_string(),
        inhomogeneous_value: InhomogeneousValue {
            inhomogeneous_parameter: parameter,
            value: density.profile.expression(),
        },
    }];
    let membrane = &mut cell.biophysics_mut().membrane_properties;
    match &density.erev {
        Some(erev) => {
            let erev = checked(erev, Dimension::Voltage, &id)?;
            membrane.channel_density_non_uniforms.push(ChannelDensityNonUniform {
                id,
                ion_channel: density.ion_channel.clone(),
                erev,
                ion: density.ion,
                variable_parameters,
            });
        }
        None => {
            membrane
                .channel_density_non_uniform_nernsts
                .push(ChannelDensityNonUniformNernst {
                    id,
                    ion_channel: density.ion_channel.clone(),
                    ion: density.ion,
                    variable_parameters,
                });
        }
    }
    document.add_include(&density.channel_file());
    Ok(())
}

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{debug, info};

use crate::constants::{
    ALL_GROUP, APICAL_GROUP, AXON_GROUP, BASAL_GROUP, DENDRITE_GROUP, NEUROLEX_AXON,
    NEUROLEX_DENDRITE, NEUROLEX_SOMA, SOMA_GROUP,
};
use crate::error::{AssemblyError, Result};
use crate::neuron::segment::SegmentGroup;
use crate::neuron::Cell;

/// Anatomical regions that channel densities target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    All,
    Soma,
    Axon,
    Dendrite,
    Apical,
    Basal,
}

impl Region {
    pub fn group_id(&self) -> &'static str {
        match self {
            Region::All => ALL_GROUP,
            Region::Soma => SOMA_GROUP,
            Region::Axon => AXON_GROUP,
            Region::Dendrite => DENDRITE_GROUP,
            Region::Apical => APICAL_GROUP,
            Region::Basal => BASAL_GROUP,
        }
    }

    /// Suffix used in descriptor ids, e.g. `NaTa_t_somatic`.
    pub fn adjective(&self) -> &'static str {
        match self {
            Region::All => "all",
            Region::Soma => "somatic",
            Region::Axon => "axonal",
            Region::Dendrite => "dendritic",
            Region::Apical => "apical",
            Region::Basal => "basal",
        }
    }
}

/// A set of segment indices written as a union of inclusive ranges.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexTable {
    pub name: &'static str,
    pub ranges: Vec<RangeInclusive<u32>>,
}

impl IndexTable {
    pub fn new(name: &'static str, ranges: Vec<RangeInclusive<u32>>) -> Self {
        IndexTable { name, ranges }
    }

    pub fn contains(&self, index: u32) -> bool {
        self.ranges.iter().any(|r| r.contains(&index))
    }

    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|r| r.clone())
    }
}

/// The primary partition of one reconstruction into soma, axon, apical
/// and basal filaments.
#[derive(Clone, Debug, PartialEq)]
pub struct AnatomyTables {
    pub soma: IndexTable,
    pub axon: IndexTable,
    pub apical: IndexTable,
    pub basal: IndexTable,
}

impl AnatomyTables {
    fn tables(&self) -> [(&IndexTable, Region); 4] {
        [
            (&self.soma, Region::Soma),
            (&self.axon, Region::Axon),
            (&self.apical, Region::Apical),
            (&self.basal, Region::Basal),
        ]
    }

    /// Fails if any index appears in two of the primary tables.
    pub fn validate(&self) -> Result<()> {
        let tables = self.tables();
        for (i, (first, _)) in tables.iter().enumerate() {
            for (second, _) in tables.iter().skip(i + 1) {
                if let Some(index) = first.indices().find(|ix| second.contains(*ix)) {
                    return Err(AssemblyError::OverlappingTables {
                        index,
                        first: first.name.to_string(),
                        second: second.name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The primary region for a filament index, if any table lists it.
    pub fn region_of(&self, index: u32) -> Option<Region> {
        self.tables()
            .iter()
            .find(|(table, _)| table.contains(index))
            .map(|(_, region)| *region)
    }
}

/// Filament tables of the HL5PC reconstruction, from the subsets in its
/// NEURON model setup. Indices 0 to 210 are each covered exactly once.
pub static HL5PC_TABLES: Lazy<AnatomyTables> = Lazy::new(|| AnatomyTables {
    soma: IndexTable::new(
        "soma",
        vec![0..=6, 9..=10, 14..=14, 18..=21, 32..=32],
    ),
    axon: IndexTable::new("axon", vec![13..=13]),
    apical: IndexTable::new(
        "apical",
        vec![
            7..=7,
            15..=16,
            24..=27,
            37..=44,
            59..=66,
            85..=94,
            109..=114,
            123..=128,
            131..=210,
        ],
    ),
    basal: IndexTable::new(
        "basal",
        vec![
            8..=8,
            11..=12,
            17..=17,
            22..=23,
            28..=31,
            33..=36,
            45..=58,
            67..=84,
            95..=108,
            115..=122,
            129..=130,
        ],
    ),
});

/// Create the conventional groups if missing. Existing groups with the same
/// ids are kept as they are; a new `all` group lists every segment.
pub fn setup_default_groups(cell: &mut Cell) {
    let morphology = &mut cell.morphology;
    if morphology.segment_group(ALL_GROUP).is_none() {
        let mut all = SegmentGroup::new(ALL_GROUP)
            .with_notes("Default group containing all segments in the cell");
        all.members = morphology.segments.iter().map(|s| s.id).collect();
        morphology.segment_groups.push(all);
    }
    morphology.ensure_group(
        SegmentGroup::new(SOMA_GROUP)
            .with_neuro_lex_id(NEUROLEX_SOMA)
            .with_notes("Default soma segment group for the cell"),
    );
    morphology.ensure_group(
        SegmentGroup::new(DENDRITE_GROUP)
            .with_neuro_lex_id(NEUROLEX_DENDRITE)
            .with_notes("Default dendrite segment group for the cell"),
    );
    morphology.ensure_group(
        SegmentGroup::new(AXON_GROUP)
            .with_neuro_lex_id(NEUROLEX_AXON)
            .with_notes("Default axon segment group for the cell"),
    );
    morphology.ensure_group(
        SegmentGroup::new(BASAL_GROUP)
            .with_neuro_lex_id(NEUROLEX_DENDRITE)
            .with_notes("Basal dendrites"),
    );
    morphology.ensure_group(
        SegmentGroup::new(APICAL_GROUP)
            .with_neuro_lex_id(NEUROLEX_DENDRITE)
            .with_notes("Apical dendrite_group"),
    );
}

/// Sort every filament group of the cell into its anatomical group, then
/// rebuild `dendrite_group` as apical plus basal.
pub fn classify(cell: &mut Cell, tables: &AnatomyTables) -> Result<()> {
    tables.validate()?;
    setup_default_groups(cell);

    info!("Populating necessary segment groups");
    let assignments: Vec<(String, Region)> = cell
        .morphology
        .segment_groups
        .iter()
        .filter_map(|g| {
            let index = g.filament_index()?;
            tables.region_of(index).map(|r| (g.id.clone(), r))
        })
        .collect();
    for (filament, region) in assignments.iter() {
        debug!(filament = %filament, region = region.group_id(), "classified");
        cell.morphology
            .require_group_mut(region.group_id())?
            .include(filament);
    }

    let dendrite = cell.morphology.require_group_mut(DENDRITE_GROUP)?;
    dendrite.includes = vec![APICAL_GROUP.to_string(), BASAL_GROUP.to_string()];

    info!("Optimising groups");
    cell.morphology.optimise_segment_groups();
    info!("Reordering groups");
    cell.morphology.reorder_segment_groups()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::segment::{Point3DWithDiam, Segment};
    use crate::neuron::Morphology;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn filament_cell(indices: &[u32]) -> Cell {
        let segments = indices
            .iter()
            .map(|&i| Segment {
                id: i,
                name: None,
                neuro_lex_id: None,
                parent: None,
                proximal: None,
                distal: Point3DWithDiam { x: i as f64, y: 0.0, z: 0.0, diameter: 1.0 },
            })
            .collect();
        let mut segment_groups: Vec<SegmentGroup> = indices
            .iter()
            .map(|&i| {
                let mut g = SegmentGroup::new(&format!("filament_100000042_{i}"));
                g.members.push(i);
                g
            })
            .collect();
        segment_groups.push(SegmentGroup::new("unrelated_group"));
        Cell {
            id: "c".into(),
            notes: None,
            morphology: Morphology { id: "m".into(), segments, segment_groups },
            biophysical_properties: None,
        }
    }

    #[test]
    fn builtin_tables_partition_the_reconstruction() {
        HL5PC_TABLES.validate().unwrap();
        for index in 0..=210 {
            assert!(HL5PC_TABLES.region_of(index).is_some(), "{index} is unassigned");
        }
        assert_eq!(HL5PC_TABLES.region_of(211), None);
        assert_eq!(HL5PC_TABLES.region_of(13), Some(Region::Axon));
        assert_eq!(HL5PC_TABLES.region_of(12), Some(Region::Basal));
        assert_eq!(HL5PC_TABLES.region_of(2), Some(Region::Soma));
    }

    #[test]
    fn overlapping_tables_are_rejected_before_mutation() {
        let mut tables = HL5PC_TABLES.clone();
        tables.basal.ranges.push(2..=2);
        let mut cell = filament_cell(&[0, 1, 2]);
        let before = cell.clone();
        let err = classify(&mut cell, &tables).unwrap_err();
        assert!(matches!(
            err,
            AssemblyError::OverlappingTables { index: 2, ref first, ref second }
                if first == "soma" && second == "basal"
        ));
        assert_eq!(cell, before);
    }

    #[test]
    fn classify_assigns_filaments_and_skips_others() {
        let mut cell = filament_cell(&[0, 7, 8, 13, 500]);
        classify(&mut cell, &HL5PC_TABLES).unwrap();
        let m = &cell.morphology;
        assert_eq!(m.segment_group(SOMA_GROUP).unwrap().includes, vec!["filament_100000042_0"]);
        assert_eq!(m.segment_group(AXON_GROUP).unwrap().includes, vec!["filament_100000042_13"]);
        assert_eq!(m.segment_group(APICAL_GROUP).unwrap().includes, vec!["filament_100000042_7"]);
        assert_eq!(m.segment_group(BASAL_GROUP).unwrap().includes, vec!["filament_100000042_8"]);
        assert!(m.segment_group("unrelated_group").unwrap().includes.is_empty());
        let all = m.resolve_members(ALL_GROUP).unwrap();
        assert_eq!(all, BTreeSet::from([0, 7, 8, 13, 500]));
    }

    #[test]
    fn dendrite_is_union_of_apical_and_basal() {
        let indices: Vec<u32> = (0..=210).collect();
        let mut cell = filament_cell(&indices);
        classify(&mut cell, &HL5PC_TABLES).unwrap();
        let m = &cell.morphology;
        let apical = m.resolve_members(APICAL_GROUP).unwrap();
        let basal = m.resolve_members(BASAL_GROUP).unwrap();
        let dendrite = m.resolve_members(DENDRITE_GROUP).unwrap();
        assert_eq!(dendrite, apical.union(&basal).copied().collect());
        assert!(apical.is_disjoint(&basal));
    }

    #[test]
    fn classify_twice_is_stable() {
        let mut cell = filament_cell(&[0, 7, 8, 13]);
        classify(&mut cell, &HL5PC_TABLES).unwrap();
        let once = cell.clone();
        classify(&mut cell, &HL5PC_TABLES).unwrap();
        assert_eq!(cell, once);
    }

    #[test]
    fn groups_follow_their_includes() {
        let mut cell = filament_cell(&[0, 7, 8]);
        classify(&mut cell, &HL5PC_TABLES).unwrap();
        let ids: Vec<&str> = cell.morphology.segment_groups.iter().map(|g| g.id.as_str()).collect();
        let pos = |id: &str| ids.iter().position(|i| *i == id).unwrap();
        assert!(pos(APICAL_GROUP) < pos(DENDRITE_GROUP));
        assert!(pos(BASAL_GROUP) < pos(DENDRITE_GROUP));
        assert!(pos("filament_100000042_7") < pos(APICAL_GROUP));
    }

    proptest! {
        #[test]
        fn each_index_is_in_at_most_one_table(index in 0u32..1000) {
            let t = &*HL5PC_TABLES;
            let hits = [&t.soma, &t.axon, &t.apical, &t.basal]
                .iter()
                .filter(|table| table.contains(index))
                .count();
            prop_assert!(hits <= 1);
        }
    }
}

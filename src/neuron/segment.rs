use crate::constants::FILAMENT_PREFIX;

/// A point on the reconstruction with the neurite diameter there, in microns.
#[derive(Clone, Debug, PartialEq)]
pub struct Point3DWithDiam {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub diameter: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentParent {
    pub segment: u32,
    /// Where along the parent this segment attaches; NeuroML defaults to 1.
    pub fraction_along: Option<f64>,
}

/// One piece of the reconstructed morphology. Never mutated after load.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub id: u32,
    pub name: Option<String>,
    pub neuro_lex_id: Option<String>,
    pub parent: Option<SegmentParent>,
    pub proximal: Option<Point3DWithDiam>,
    pub distal: Point3DWithDiam,
}

impl Segment {
    pub fn length(&self, parent: Option<&Segment>) -> f64 {
        let start = match (&self.proximal, parent) {
            (Some(p), _) => p,
            (None, Some(parent)) => &parent.distal,
            (None, None) => return 0.0,
        };
        ((self.distal.x - start.x).powi(2)
            + (self.distal.y - start.y).powi(2)
            + (self.distal.z - start.z).powi(2))
        .sqrt()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub tag: String,
    pub value: String,
}

/// Segments from `from` to `to` along the parent chain, both ends included.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentPath {
    pub from: Option<u32>,
    pub to: Option<u32>,
}

/// `from` and all of its descendants.
#[derive(Clone, Debug, PartialEq)]
pub struct SubTree {
    pub from: Option<u32>,
    pub to: Option<u32>,
}

/// A scalar field over a segment group, used as the independent variable
/// of distance-dependent channel densities.
#[derive(Clone, Debug, PartialEq)]
pub struct InhomogeneousParameter {
    pub id: String,
    pub variable: String,
    pub metric: String,
    pub proximal_translation_start: Option<f64>,
    pub distal_normalization_end: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentGroup {
    pub id: String,
    pub neuro_lex_id: Option<String>,
    pub notes: Option<String>,
    pub properties: Vec<Property>,
    /// Segment ids listed directly.
    pub members: Vec<u32>,
    /// Ids of other segment groups included in this one.
    pub includes: Vec<String>,
    pub paths: Vec<SegmentPath>,
    pub sub_trees: Vec<SubTree>,
    pub inhomogeneous_parameters: Vec<InhomogeneousParameter>,
}

impl SegmentGroup {
    pub fn new(id: &str) -> Self {
        SegmentGroup {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_neuro_lex_id(mut self, neuro_lex_id: &str) -> Self {
        self.neuro_lex_id = Some(neuro_lex_id.to_string());
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn include(&mut self, group_id: &str) {
        self.includes.push(group_id.to_string());
    }

    /// Drop repeated members and includes, keeping the first occurrence.
    pub fn optimise(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.members.retain(|m| seen.insert(*m));
        let mut seen = std::collections::HashSet::new();
        self.includes.retain(|i| seen.insert(i.clone()));
    }

    /// The trailing index of an autogenerated `filament_<docid>_<index>` id.
    pub fn filament_index(&self) -> Option<u32> {
        filament_index(&self.id)
    }
}

pub fn filament_index(id: &str) -> Option<u32> {
    let mut parts = id.split('_');
    if parts.next() != Some(FILAMENT_PREFIX) {
        return None;
    }
    let _doc_id = parts.next()?;
    let index = parts.next()?.parse::<u32>().ok()?;
    match parts.next() {
        None => Some(index),
        Some(_) => None,
    }
}

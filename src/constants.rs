pub const NEUROML_NAMESPACE: &str = "http://www.neuroml.org/schema/neuroml2";
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const SCHEMA_LOCATION: &str = "http://www.neuroml.org/schema/neuroml2 https://raw.github.com/NeuroML/NeuroML2/development/Schemas/NeuroML2/NeuroML_v2.3.xsd";

/// NeuroLex ids used to tag the anatomical segment groups.
pub const NEUROLEX_SOMA: &str = "GO:0043025";
pub const NEUROLEX_DENDRITE: &str = "GO:0030425";
pub const NEUROLEX_AXON: &str = "GO:0030424";

pub const ALL_GROUP: &str = "all";
pub const SOMA_GROUP: &str = "soma_group";
pub const DENDRITE_GROUP: &str = "dendrite_group";
pub const AXON_GROUP: &str = "axon_group";
pub const APICAL_GROUP: &str = "apical_dendrite_group";
pub const BASAL_GROUP: &str = "basal_dendrite_group";

/// Prefix of the autogenerated per-filament segment groups.
pub const FILAMENT_PREFIX: &str = "filament";

pub const PATH_LENGTH_METRIC: &str = "Path Length from root";
pub const PATH_LENGTH_VARIABLE: &str = "p";

pub const DEFAULT_CELL: &str = "HL5PC";
pub const MORPHOLOGY_SUFFIX: &str = ".morph.cell.nml";
pub const CELL_SUFFIX: &str = ".cell.nml";

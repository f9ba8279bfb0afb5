use roxmltree::Node;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{ALL_GROUP, NEUROML_NAMESPACE, SCHEMA_LOCATION, XSD_NAMESPACE, XSI_NAMESPACE};
use crate::dimension::{Quantity, QuantityError};
use crate::error::{AssemblyError, Result};
use crate::neuron::channel::{
    ChannelDensity, ChannelDensityNernst, ChannelDensityNonUniform, ChannelDensityNonUniformNernst,
    InhomogeneousValue, Ion, VariableParameter,
};
use crate::neuron::membrane::{
    BiophysicalProperties, GroupValue, IntracellularProperties, MembraneProperties, Species,
};
use crate::neuron::segment::{
    InhomogeneousParameter, Point3DWithDiam, Property, Segment, SegmentGroup, SegmentParent,
    SegmentPath, SubTree,
};
use crate::neuron::{Cell, Document, Morphology};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("error opening {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("expected a <neuroml> root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("<{element}> is missing attribute {attribute}")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("<{element}> has no <{child}>")]
    MissingElement {
        element: String,
        child: &'static str,
    },

    #[error("<{element}> {attribute}: invalid number {value:?}")]
    InvalidNumber {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("<{element}> {attribute}: {source}")]
    InvalidQuantity {
        element: String,
        attribute: &'static str,
        #[source]
        source: QuantityError,
    },

    #[error("<{element}>: unknown ion {ion:?}")]
    UnknownIon { element: String, ion: String },
}

type ParseResult<T> = std::result::Result<T, ParseError>;

pub fn read_file<P: AsRef<Path>>(fp: P) -> ParseResult<Document> {
    let path = fp.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&contents)
}

pub fn parse_document(contents: &str) -> ParseResult<Document> {
    let tree = roxmltree::Document::parse(contents)?;
    let root = tree.root_element();
    if root.tag_name().name() != "neuroml" {
        return Err(ParseError::UnexpectedRoot(root.tag_name().name().to_string()));
    }
    let mut document = Document {
        id: required(&root, "id")?,
        ..Default::default()
    };
    for child in elements(&root) {
        match child.tag_name().name() {
            "notes" => document.notes = Some(text(&child)),
            "include" => document.add_include(&required(&child, "href")?),
            "cell" => document.cells.push(parse_cell(&child)?),
            other => debug!("dropping <{other}> from document {}", document.id),
        }
    }
    Ok(document)
}

fn elements<'a, 'input>(node: &Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

fn text(node: &Node) -> String {
    node.text().unwrap_or_default().to_string()
}

fn tag(node: &Node) -> String {
    node.tag_name().name().to_string()
}

fn required(node: &Node, attribute: &'static str) -> ParseResult<String> {
    node.attribute(attribute)
        .map(str::to_string)
        .ok_or_else(|| ParseError::MissingAttribute { element: tag(node), attribute })
}

fn optional(node: &Node, attribute: &str) -> Option<String> {
    node.attribute(attribute).map(str::to_string)
}

fn parse<T: FromStr>(node: &Node, attribute: &'static str) -> ParseResult<T> {
    let value = required(node, attribute)?;
    value.trim().parse::<T>().map_err(|_| ParseError::InvalidNumber {
        element: tag(node),
        attribute,
        value,
    })
}

fn parse_optional<T: FromStr>(node: &Node, attribute: &'static str) -> ParseResult<Option<T>> {
    match node.attribute(attribute) {
        None => Ok(None),
        Some(_) => parse(node, attribute).map(Some),
    }
}

fn quantity(node: &Node, attribute: &'static str) -> ParseResult<Quantity> {
    required(node, attribute)?
        .parse()
        .map_err(|source| ParseError::InvalidQuantity { element: tag(node), attribute, source })
}

fn ion(node: &Node) -> ParseResult<Ion> {
    let name = required(node, "ion")?;
    Ion::from_name(&name).ok_or(ParseError::UnknownIon { element: tag(node), ion: name })
}

fn group_or_all(node: &Node) -> String {
    optional(node, "segmentGroup").unwrap_or_else(|| ALL_GROUP.to_string())
}

fn group_value(node: &Node) -> ParseResult<GroupValue> {
    Ok(GroupValue {
        value: quantity(node, "value")?,
        segment_group: group_or_all(node),
    })
}

fn parse_cell(node: &Node) -> ParseResult<Cell> {
    let mut cell = Cell {
        id: required(node, "id")?,
        ..Default::default()
    };
    for child in elements(node) {
        match child.tag_name().name() {
            "notes" => cell.notes = Some(text(&child)),
            "morphology" => cell.morphology = parse_morphology(&child)?,
            "biophysicalProperties" => {
                cell.biophysical_properties = Some(parse_biophysics(&child)?)
            }
            other => warn!("dropping <{other}> from cell {}", cell.id),
        }
    }
    Ok(cell)
}

fn parse_point(node: &Node) -> ParseResult<Point3DWithDiam> {
    Ok(Point3DWithDiam {
        x: parse(node, "x")?,
        y: parse(node, "y")?,
        z: parse(node, "z")?,
        diameter: parse(node, "diameter")?,
    })
}

fn parse_morphology(node: &Node) -> ParseResult<Morphology> {
    let mut morphology = Morphology {
        id: required(node, "id")?,
        ..Default::default()
    };
    for child in elements(node) {
        match child.tag_name().name() {
            "segment" => morphology.segments.push(parse_segment(&child)?),
            "segmentGroup" => morphology.segment_groups.push(parse_segment_group(&child)?),
            other => warn!("dropping <{other}> from morphology {}", morphology.id),
        }
    }
    Ok(morphology)
}

fn parse_segment(node: &Node) -> ParseResult<Segment> {
    let mut parent = None;
    let mut proximal = None;
    let mut distal = None;
    for child in elements(node) {
        match child.tag_name().name() {
            "parent" => {
                parent = Some(SegmentParent {
                    segment: parse(&child, "segment")?,
                    fraction_along: parse_optional(&child, "fractionAlong")?,
                })
            }
            "proximal" => proximal = Some(parse_point(&child)?),
            "distal" => distal = Some(parse_point(&child)?),
            _ => {}
        }
    }
    Ok(Segment {
        id: parse(node, "id")?,
        name: optional(node, "name"),
        neuro_lex_id: optional(node, "neuroLexId"),
        parent,
        proximal,
        distal: distal.ok_or(ParseError::MissingElement { element: tag(node), child: "distal" })?,
    })
}

fn parse_segment_group(node: &Node) -> ParseResult<SegmentGroup> {
    let mut group = SegmentGroup::new(&required(node, "id")?);
    group.neuro_lex_id = optional(node, "neuroLexId");
    for child in elements(node) {
        match child.tag_name().name() {
            "notes" => group.notes = Some(text(&child)),
            "property" => group.properties.push(Property {
                tag: required(&child, "tag")?,
                value: required(&child, "value")?,
            }),
            "member" => group.members.push(parse(&child, "segment")?),
            "include" => group.includes.push(required(&child, "segmentGroup")?),
            "path" => group.paths.push(SegmentPath {
                from: endpoint(&child, "from")?,
                to: endpoint(&child, "to")?,
            }),
            "subTree" => group.sub_trees.push(SubTree {
                from: endpoint(&child, "from")?,
                to: endpoint(&child, "to")?,
            }),
            "inhomogeneousParameter" => {
                group.inhomogeneous_parameters.push(parse_inhomogeneous_parameter(&child)?)
            }
            other => debug!("dropping <{other}> from segment group {}", group.id),
        }
    }
    Ok(group)
}

/// `<from segment="3"/>` inside a path or sub-tree.
fn endpoint(node: &Node, name: &str) -> ParseResult<Option<u32>> {
    match elements(node).find(|c| c.tag_name().name() == name) {
        None => Ok(None),
        Some(end) => parse(&end, "segment").map(Some),
    }
}

fn parse_inhomogeneous_parameter(node: &Node) -> ParseResult<InhomogeneousParameter> {
    let mut parameter = InhomogeneousParameter {
        id: required(node, "id")?,
        variable: required(node, "variable")?,
        metric: required(node, "metric")?,
        proximal_translation_start: None,
        distal_normalization_end: None,
    };
    for child in elements(node) {
        match child.tag_name().name() {
            "proximal" => {
                parameter.proximal_translation_start = parse_optional(&child, "translationStart")?
            }
            "distal" => {
                parameter.distal_normalization_end = parse_optional(&child, "normalizationEnd")?
            }
            _ => {}
        }
    }
    Ok(parameter)
}

fn parse_variable_parameters(node: &Node) -> ParseResult<Vec<VariableParameter>> {
    let mut out = vec![];
    for child in elements(node).filter(|c| c.has_tag_name("variableParameter")) {
        let value = elements(&child)
            .find(|c| c.has_tag_name("inhomogeneousValue"))
            .ok_or(ParseError::MissingElement {
                element: tag(&child),
                child: "inhomogeneousValue",
            })?;
        out.push(VariableParameter {
            parameter: required(&child, "parameter")?,
            segment_group: required(&child, "segmentGroup")?,
            inhomogeneous_value: InhomogeneousValue {
                inhomogeneous_parameter: required(&value, "inhomogeneousParameter")?,
                value: required(&value, "value")?,
            },
        });
    }
    Ok(out)
}

fn parse_biophysics(node: &Node) -> ParseResult<BiophysicalProperties> {
    let mut biophysics = BiophysicalProperties::new(&required(node, "id")?);
    for child in elements(node) {
        match child.tag_name().name() {
            "membraneProperties" => {
                biophysics.membrane_properties = parse_membrane_properties(&child)?
            }
            "intracellularProperties" => {
                biophysics.intracellular_properties = parse_intracellular_properties(&child)?
            }
            other => warn!("dropping <{other}> from biophysical properties"),
        }
    }
    Ok(biophysics)
}

fn parse_membrane_properties(node: &Node) -> ParseResult<MembraneProperties> {
    let mut m = MembraneProperties::default();
    for child in elements(node) {
        match child.tag_name().name() {
            "channelDensity" => m.channel_densities.push(ChannelDensity {
                id: required(&child, "id")?,
                ion_channel: required(&child, "ionChannel")?,
                cond_density: quantity(&child, "condDensity")?,
                erev: quantity(&child, "erev")?,
                segment_group: group_or_all(&child),
                ion: ion(&child)?,
            }),
            "channelDensityNernst" => m.channel_density_nernsts.push(ChannelDensityNernst {
                id: required(&child, "id")?,
                ion_channel: required(&child, "ionChannel")?,
                cond_density: quantity(&child, "condDensity")?,
                segment_group: group_or_all(&child),
                ion: ion(&child)?,
            }),
            "channelDensityNonUniform" => {
                m.channel_density_non_uniforms.push(ChannelDensityNonUniform {
                    id: required(&child, "id")?,
                    ion_channel: required(&child, "ionChannel")?,
                    erev: quantity(&child, "erev")?,
                    ion: ion(&child)?,
                    variable_parameters: parse_variable_parameters(&child)?,
                })
            }
            "channelDensityNonUniformNernst" => {
                m.channel_density_non_uniform_nernsts.push(ChannelDensityNonUniformNernst {
                    id: required(&child, "id")?,
                    ion_channel: required(&child, "ionChannel")?,
                    ion: ion(&child)?,
                    variable_parameters: parse_variable_parameters(&child)?,
                })
            }
            "spikeThresh" => m.spike_threshes.push(group_value(&child)?),
            "specificCapacitance" => m.specific_capacitances.push(group_value(&child)?),
            "initMembPotential" => m.init_memb_potentials.push(group_value(&child)?),
            other => warn!("dropping <{other}> from membrane properties"),
        }
    }
    Ok(m)
}

fn parse_intracellular_properties(node: &Node) -> ParseResult<IntracellularProperties> {
    let mut p = IntracellularProperties::default();
    for child in elements(node) {
        match child.tag_name().name() {
            "species" => p.species.push(Species {
                id: required(&child, "id")?,
                concentration_model: required(&child, "concentrationModel")?,
                ion: ion(&child)?,
                initial_concentration: quantity(&child, "initialConcentration")?,
                initial_ext_concentration: quantity(&child, "initialExtConcentration")?,
                segment_group: group_or_all(&child),
            }),
            "resistivity" => p.resistivities.push(group_value(&child)?),
            other => warn!("dropping <{other}> from intracellular properties"),
        }
    }
    Ok(p)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Default)]
struct Attrs(Vec<(&'static str, String)>);

impl Attrs {
    fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        self.0.push((name, value.to_string()));
        self
    }

    fn opt(self, name: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }
}

/// Indented XML output, four spaces per level.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        XmlWriter {
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            depth: 0,
        }
    }

    fn start(&mut self, tag: &str, attrs: &Attrs) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs.0.iter() {
            let _ = write!(self.out, " {name}=\"{}\"", escape(value));
        }
    }

    fn open(&mut self, tag: &str, attrs: Attrs) {
        self.start(tag, &attrs);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn empty(&mut self, tag: &str, attrs: Attrs) {
        self.start(tag, &attrs);
        self.out.push_str("/>\n");
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        let _ = writeln!(self.out, "</{tag}>");
    }

    fn text(&mut self, tag: &str, text: &str) {
        self.start(tag, &Attrs::default());
        let _ = writeln!(self.out, ">{}</{tag}>", escape(text));
    }

    /// Open `tag` if `has_children`, otherwise write it empty.
    fn open_or_empty(&mut self, tag: &str, attrs: Attrs, has_children: bool) -> bool {
        if has_children {
            self.open(tag, attrs);
        } else {
            self.empty(tag, attrs);
        }
        has_children
    }
}

/// Serialize a document in NeuroML schema order.
pub fn to_xml_string(document: &Document) -> String {
    let mut w = XmlWriter::new();
    w.open(
        "neuroml",
        Attrs::default()
            .with("xmlns", NEUROML_NAMESPACE)
            .with("xmlns:xs", XSD_NAMESPACE)
            .with("xmlns:xsi", XSI_NAMESPACE)
            .with("xsi:schemaLocation", SCHEMA_LOCATION)
            .with("id", &document.id),
    );
    if let Some(notes) = &document.notes {
        w.text("notes", notes);
    }
    for href in document.includes.iter() {
        w.empty("include", Attrs::default().with("href", href));
    }
    for cell in document.cells.iter() {
        write_cell(&mut w, cell);
    }
    w.close("neuroml");
    w.out
}

fn write_cell(w: &mut XmlWriter, cell: &Cell) {
    w.open("cell", Attrs::default().with("id", &cell.id));
    if let Some(notes) = &cell.notes {
        w.text("notes", notes);
    }
    write_morphology(w, &cell.morphology);
    if let Some(biophysics) = &cell.biophysical_properties {
        write_biophysics(w, biophysics);
    }
    w.close("cell");
}

fn point_attrs(p: &Point3DWithDiam) -> Attrs {
    Attrs::default()
        .with("x", p.x)
        .with("y", p.y)
        .with("z", p.z)
        .with("diameter", p.diameter)
}

fn write_morphology(w: &mut XmlWriter, morphology: &Morphology) {
    w.open("morphology", Attrs::default().with("id", &morphology.id));
    for s in morphology.segments.iter() {
        w.open(
            "segment",
            Attrs::default()
                .with("id", s.id)
                .opt("name", s.name.as_ref())
                .opt("neuroLexId", s.neuro_lex_id.as_ref()),
        );
        if let Some(parent) = &s.parent {
            w.empty(
                "parent",
                Attrs::default()
                    .with("segment", parent.segment)
                    .opt("fractionAlong", parent.fraction_along),
            );
        }
        if let Some(proximal) = &s.proximal {
            w.empty("proximal", point_attrs(proximal));
        }
        w.empty("distal", point_attrs(&s.distal));
        w.close("segment");
    }
    for g in morphology.segment_groups.iter() {
        write_segment_group(w, g);
    }
    w.close("morphology");
}

fn write_segment_group(w: &mut XmlWriter, g: &SegmentGroup) {
    let has_children = g.notes.is_some()
        || !g.properties.is_empty()
        || !g.members.is_empty()
        || !g.includes.is_empty()
        || !g.paths.is_empty()
        || !g.sub_trees.is_empty()
        || !g.inhomogeneous_parameters.is_empty();
    let attrs = Attrs::default()
        .with("id", &g.id)
        .opt("neuroLexId", g.neuro_lex_id.as_ref());
    if !w.open_or_empty("segmentGroup", attrs, has_children) {
        return;
    }
    if let Some(notes) = &g.notes {
        w.text("notes", notes);
    }
    for p in g.properties.iter() {
        w.empty("property", Attrs::default().with("tag", &p.tag).with("value", &p.value));
    }
    for m in g.members.iter() {
        w.empty("member", Attrs::default().with("segment", m));
    }
    for i in g.includes.iter() {
        w.empty("include", Attrs::default().with("segmentGroup", i));
    }
    for (tag, from, to) in g
        .paths
        .iter()
        .map(|p| ("path", p.from, p.to))
        .chain(g.sub_trees.iter().map(|s| ("subTree", s.from, s.to)))
    {
        w.open(tag, Attrs::default());
        if let Some(from) = from {
            w.empty("from", Attrs::default().with("segment", from));
        }
        if let Some(to) = to {
            w.empty("to", Attrs::default().with("segment", to));
        }
        w.close(tag);
    }
    for p in g.inhomogeneous_parameters.iter() {
        w.open(
            "inhomogeneousParameter",
            Attrs::default()
                .with("id", &p.id)
                .with("variable", &p.variable)
                .with("metric", &p.metric),
        );
        if let Some(start) = p.proximal_translation_start {
            w.empty("proximal", Attrs::default().with("translationStart", start));
        }
        if let Some(end) = p.distal_normalization_end {
            w.empty("distal", Attrs::default().with("normalizationEnd", end));
        }
        w.close("inhomogeneousParameter");
    }
    w.close("segmentGroup");
}

fn write_variable_parameters(w: &mut XmlWriter, parameters: &[VariableParameter]) {
    for p in parameters.iter() {
        w.open(
            "variableParameter",
            Attrs::default()
                .with("parameter", &p.parameter)
                .with("segmentGroup", &p.segment_group),
        );
        w.empty(
            "inhomogeneousValue",
            Attrs::default()
                .with("inhomogeneousParameter", &p.inhomogeneous_value.inhomogeneous_parameter)
                .with("value", &p.inhomogeneous_value.value),
        );
        w.close("variableParameter");
    }
}

fn write_group_values(w: &mut XmlWriter, tag: &str, values: &[GroupValue]) {
    for v in values.iter() {
        w.empty(
            tag,
            Attrs::default()
                .with("value", &v.value)
                .with("segmentGroup", &v.segment_group),
        );
    }
}

fn write_biophysics(w: &mut XmlWriter, b: &BiophysicalProperties) {
    w.open("biophysicalProperties", Attrs::default().with("id", &b.id));

    let m = &b.membrane_properties;
    w.open("membraneProperties", Attrs::default());
    for d in m.channel_densities.iter() {
        w.empty(
            "channelDensity",
            Attrs::default()
                .with("id", &d.id)
                .with("ionChannel", &d.ion_channel)
                .with("condDensity", &d.cond_density)
                .with("erev", &d.erev)
                .with("segmentGroup", &d.segment_group)
                .with("ion", d.ion),
        );
    }
    for d in m.channel_density_nernsts.iter() {
        w.empty(
            "channelDensityNernst",
            Attrs::default()
                .with("id", &d.id)
                .with("ionChannel", &d.ion_channel)
                .with("condDensity", &d.cond_density)
                .with("segmentGroup", &d.segment_group)
                .with("ion", d.ion),
        );
    }
    for d in m.channel_density_non_uniforms.iter() {
        let attrs = Attrs::default()
            .with("id", &d.id)
            .with("ionChannel", &d.ion_channel)
            .with("erev", &d.erev)
            .with("ion", d.ion);
        if w.open_or_empty("channelDensityNonUniform", attrs, !d.variable_parameters.is_empty()) {
            write_variable_parameters(w, &d.variable_parameters);
            w.close("channelDensityNonUniform");
        }
    }
    for d in m.channel_density_non_uniform_nernsts.iter() {
        let attrs = Attrs::default()
            .with("id", &d.id)
            .with("ionChannel", &d.ion_channel)
            .with("ion", d.ion);
        let has_children = !d.variable_parameters.is_empty();
        if w.open_or_empty("channelDensityNonUniformNernst", attrs, has_children) {
            write_variable_parameters(w, &d.variable_parameters);
            w.close("channelDensityNonUniformNernst");
        }
    }
    write_group_values(w, "spikeThresh", &m.spike_threshes);
    write_group_values(w, "specificCapacitance", &m.specific_capacitances);
    write_group_values(w, "initMembPotential", &m.init_memb_potentials);
    w.close("membraneProperties");

    let p = &b.intracellular_properties;
    w.open("intracellularProperties", Attrs::default());
    for s in p.species.iter() {
        w.empty(
            "species",
            Attrs::default()
                .with("id", &s.id)
                .with("concentrationModel", &s.concentration_model)
                .with("ion", s.ion)
                .with("initialConcentration", &s.initial_concentration)
                .with("initialExtConcentration", &s.initial_ext_concentration)
                .with("segmentGroup", &s.segment_group),
        );
    }
    write_group_values(w, "resistivity", &p.resistivities);
    w.close("intracellularProperties");

    w.close("biophysicalProperties");
}

/// Write the document next to its destination and move it into place, so a
/// failed run never leaves a partial file at `fp`.
pub fn write_file<P: AsRef<Path>>(document: &Document, fp: P) -> Result<()> {
    let path = fp.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_error = |source: std::io::Error| AssemblyError::Io { path: path.to_path_buf(), source };
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_error)?;
    tmp.write_all(to_xml_string(document).as_bytes()).map_err(io_error)?;
    tmp.flush().map_err(io_error)?;
    tmp.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub const MORPHOLOGY_ONLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<neuroml xmlns="http://www.neuroml.org/schema/neuroml2" id="HL5PC_morph">
    <include href="ignored_by_cells.nml"/>
    <cell id="imported" metaid="x">
        <notes>Imported from Neurolucida</notes>
        <morphology id="morphology">
            <segment id="0" name="Seg0_soma">
                <proximal x="0" y="0" z="0" diameter="10"/>
                <distal x="10" y="0" z="0" diameter="10"/>
            </segment>
            <segment id="1" name="Seg1">
                <parent segment="0" fractionAlong="0.5"/>
                <distal x="10.5" y="20" z="0" diameter="1.25"/>
            </segment>
            <segmentGroup id="filament_100000042_0">
                <member segment="0"/>
            </segmentGroup>
            <segmentGroup id="filament_100000042_7">
                <property tag="color" value="0.1 0.2 0.3"/>
                <member segment="1"/>
            </segmentGroup>
            <segmentGroup id="tips">
                <path><from segment="0"/><to segment="1"/></path>
            </segmentGroup>
        </morphology>
    </cell>
    <network id="net"/>
</neuroml>
"#;

    #[test]
    fn reads_morphology_only_document() {
        let doc = parse_document(MORPHOLOGY_ONLY).unwrap();
        assert_eq!(doc.id, "HL5PC_morph");
        assert_eq!(doc.includes, vec!["ignored_by_cells.nml"]);
        let cell = doc.cell().unwrap();
        assert_eq!(cell.id, "imported");
        assert_eq!(cell.notes.as_deref(), Some("Imported from Neurolucida"));
        let m = &cell.morphology;
        assert_eq!(m.segments.len(), 2);
        assert_eq!(
            m.segments[1].parent,
            Some(SegmentParent { segment: 0, fraction_along: Some(0.5) })
        );
        assert_eq!(m.segments[1].proximal, None);
        assert_eq!(m.segments[1].distal.diameter, 1.25);
        assert_eq!(m.segment_groups[1].properties[0].value, "0.1 0.2 0.3");
        assert_eq!(m.segment_groups[2].paths, vec![SegmentPath { from: Some(0), to: Some(1) }]);
        assert!(cell.biophysical_properties.is_none());
    }

    #[test]
    fn written_document_reads_back_identically() {
        let doc = parse_document(MORPHOLOGY_ONLY).unwrap();
        let xml = to_xml_string(&doc);
        let again = parse_document(&xml).unwrap();
        assert_eq!(again, doc);
        assert_eq!(to_xml_string(&again), xml);
    }

    #[test]
    fn rejects_wrong_root() {
        let err = parse_document("<cell id=\"x\"/>").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedRoot(ref r) if r == "cell"));
    }

    #[test]
    fn rejects_bad_numbers_and_missing_distal() {
        let bad_id = r#"<neuroml id="d"><cell id="c"><morphology id="m">
            <segment id="zero"><distal x="0" y="0" z="0" diameter="1"/></segment>
        </morphology></cell></neuroml>"#;
        assert!(matches!(
            parse_document(bad_id),
            Err(ParseError::InvalidNumber { attribute: "id", .. })
        ));
        let no_distal = r#"<neuroml id="d"><cell id="c"><morphology id="m">
            <segment id="0"/>
        </morphology></cell></neuroml>"#;
        assert!(matches!(
            parse_document(no_distal),
            Err(ParseError::MissingElement { child: "distal", .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_file("/nonexistent/HL5PC.morph.cell.nml").unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn attribute_values_are_escaped() {
        let doc = Document {
            id: "a&b".into(),
            notes: Some("x < y".into()),
            ..Default::default()
        };
        let xml = to_xml_string(&doc);
        assert!(xml.contains("id=\"a&amp;b\""));
        assert!(xml.contains("<notes>x &lt; y</notes>"));
        assert_eq!(parse_document(&xml).unwrap(), doc);
    }

    #[test]
    fn write_file_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.cell.nml");
        fs::write(&path, "stale").unwrap();
        let doc = parse_document(MORPHOLOGY_ONLY).unwrap();
        write_file(&doc, &path).unwrap();
        assert_eq!(read_file(&path).unwrap(), doc);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

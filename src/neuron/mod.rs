pub mod channel;
pub mod membrane;
pub mod segment;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{AssemblyError, Result};
use crate::neuron::membrane::BiophysicalProperties;
use crate::neuron::segment::{Segment, SegmentGroup};

/// A NeuroML document holding one or more cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub id: String,
    pub notes: Option<String>,
    /// Hrefs of included documents, in first-registration order.
    pub includes: Vec<String>,
    pub cells: Vec<Cell>,
}

impl Document {
    /// Register an external file; repeated registrations are ignored.
    pub fn add_include(&mut self, href: &str) {
        if !self.includes.iter().any(|i| i == href) {
            self.includes.push(href.to_string());
        }
    }

    pub fn cell(&self) -> Result<&Cell> {
        self.cells.first().ok_or(AssemblyError::NoCell)
    }

    pub fn cell_mut(&mut self) -> Result<&mut Cell> {
        self.cells.first_mut().ok_or(AssemblyError::NoCell)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub id: String,
    pub notes: Option<String>,
    pub morphology: Morphology,
    pub biophysical_properties: Option<BiophysicalProperties>,
}

impl Cell {
    pub fn append_notes(&mut self, extra: &str) {
        let notes = self.notes.get_or_insert_with(String::new);
        notes.push_str(extra);
    }

    pub fn biophysics_mut(&mut self) -> &mut BiophysicalProperties {
        self.biophysical_properties
            .get_or_insert_with(|| BiophysicalProperties::new("biophys"))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Morphology {
    pub id: String,
    pub segments: Vec<Segment>,
    pub segment_groups: Vec<SegmentGroup>,
}

impl Morphology {
    pub fn segment_group(&self, id: &str) -> Option<&SegmentGroup> {
        self.segment_groups.iter().find(|g| g.id == id)
    }

    pub fn segment_group_mut(&mut self, id: &str) -> Option<&mut SegmentGroup> {
        self.segment_groups.iter_mut().find(|g| g.id == id)
    }

    pub fn require_group_mut(&mut self, id: &str) -> Result<&mut SegmentGroup> {
        self.segment_group_mut(id)
            .ok_or_else(|| AssemblyError::UnknownSegmentGroup(id.to_string()))
    }

    /// Return the group with this id, creating it from `template` if absent.
    pub fn ensure_group(&mut self, template: SegmentGroup) -> &mut SegmentGroup {
        match self.segment_groups.iter().position(|g| g.id == template.id) {
            Some(i) => &mut self.segment_groups[i],
            None => {
                self.segment_groups.push(template);
                let last = self.segment_groups.len() - 1;
                &mut self.segment_groups[last]
            }
        }
    }

    /// Index segment children by parent id.
    pub fn children(&self) -> HashMap<u32, Vec<u32>> {
        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for segment in self.segments.iter() {
            if let Some(parent) = &segment.parent {
                children.entry(parent.segment).or_default().push(segment.id);
            }
        }
        children
    }

    /// Path length from the root to the distal end of every segment, in microns.
    /// A child starts `fraction_along` of the way along its parent.
    pub fn path_lengths(&self) -> HashMap<u32, f64> {
        let by_id: HashMap<u32, &Segment> = self.segments.iter().map(|s| (s.id, s)).collect();
        let own: HashMap<u32, f64> = self
            .segments
            .iter()
            .map(|s| {
                let parent = s.parent.as_ref().and_then(|p| by_id.get(&p.segment)).copied();
                (s.id, s.length(parent))
            })
            .collect();
        let mut lengths: HashMap<u32, f64> = HashMap::new();
        for segment in self.segments.iter() {
            let mut chain = vec![segment];
            let mut current = segment;
            while let Some(parent) = current.parent.as_ref().and_then(|p| by_id.get(&p.segment)) {
                if lengths.contains_key(&parent.id) || chain.iter().any(|s| s.id == parent.id) {
                    break;
                }
                chain.push(parent);
                current = parent;
            }
            for s in chain.into_iter().rev() {
                if lengths.contains_key(&s.id) {
                    continue;
                }
                let base = match &s.parent {
                    Some(p) => match (lengths.get(&p.segment), own.get(&p.segment)) {
                        (Some(distal), Some(parent_length)) => {
                            distal - (1.0 - p.fraction_along.unwrap_or(1.0)) * parent_length
                        }
                        _ => 0.0,
                    },
                    None => 0.0,
                };
                lengths.insert(s.id, base + own.get(&s.id).copied().unwrap_or(0.0));
            }
        }
        lengths
    }

    /// All segment ids reachable from a group through members, paths,
    /// sub-trees and (recursively) included groups.
    pub fn resolve_members(&self, id: &str) -> Result<BTreeSet<u32>> {
        let mut visiting = HashSet::new();
        let mut out = BTreeSet::new();
        self.collect_members(id, &mut visiting, &mut out)?;
        Ok(out)
    }

    fn collect_members(
        &self,
        id: &str,
        visiting: &mut HashSet<String>,
        out: &mut BTreeSet<u32>,
    ) -> Result<()> {
        let group = self
            .segment_group(id)
            .ok_or_else(|| AssemblyError::UnknownSegmentGroup(id.to_string()))?;
        if !visiting.insert(id.to_string()) {
            return Err(AssemblyError::IncludeCycle(id.to_string()));
        }
        out.extend(group.members.iter().copied());
        for path in group.paths.iter() {
            out.extend(self.segments_on_path(path.from, path.to));
        }
        for sub_tree in group.sub_trees.iter() {
            if let Some(from) = sub_tree.from {
                out.extend(self.descendants(from));
            } else if let Some(to) = sub_tree.to {
                out.extend(self.segments_on_path(None, Some(to)));
            }
        }
        for include in group.includes.iter() {
            self.collect_members(include, visiting, out)?;
        }
        visiting.remove(id);
        Ok(())
    }

    fn descendants(&self, from: u32) -> Vec<u32> {
        let children = self.children();
        let mut out = vec![];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(c) = children.get(&id) {
                stack.extend(c.iter().copied());
            }
        }
        out
    }

    /// Walk up from `to` until `from` (or the root) is reached.
    fn segments_on_path(&self, from: Option<u32>, to: Option<u32>) -> Vec<u32> {
        let by_id: HashMap<u32, &Segment> = self.segments.iter().map(|s| (s.id, s)).collect();
        let mut out = vec![];
        let mut current = to.and_then(|t| by_id.get(&t).copied());
        while let Some(segment) = current {
            if out.contains(&segment.id) {
                break;
            }
            out.push(segment.id);
            if Some(segment.id) == from {
                break;
            }
            current = segment.parent.as_ref().and_then(|p| by_id.get(&p.segment).copied());
        }
        out
    }

    /// Drop duplicate members and includes in every group.
    pub fn optimise_segment_groups(&mut self) {
        for group in self.segment_groups.iter_mut() {
            group.optimise();
        }
    }

    /// Stably reorder groups so that each one follows every group it includes.
    pub fn reorder_segment_groups(&mut self) -> Result<()> {
        let ids: HashSet<&str> = self.segment_groups.iter().map(|g| g.id.as_str()).collect();
        for group in self.segment_groups.iter() {
            if let Some(missing) = group.includes.iter().find(|i| !ids.contains(i.as_str())) {
                return Err(AssemblyError::UnknownSegmentGroup(missing.clone()));
            }
        }
        let mut placed: HashSet<String> = HashSet::new();
        let mut remaining: Vec<SegmentGroup> = std::mem::take(&mut self.segment_groups);
        let mut ordered = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let ready = remaining
                .iter()
                .position(|g| g.includes.iter().all(|i| placed.contains(i)));
            match ready {
                Some(i) => {
                    let group = remaining.remove(i);
                    placed.insert(group.id.clone());
                    ordered.push(group);
                }
                None => {
                    let stuck = remaining[0].id.clone();
                    ordered.extend(remaining);
                    self.segment_groups = ordered;
                    return Err(AssemblyError::IncludeCycle(stuck));
                }
            }
        }
        self.segment_groups = ordered;
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::neuron::segment::{Point3DWithDiam, SegmentParent, SegmentPath, SubTree};

    fn point(x: f64) -> Point3DWithDiam {
        Point3DWithDiam { x, y: 0.0, z: 0.0, diameter: 1.0 }
    }

    /// A five-segment line 0 - 1 - 2 - 3 with 4 branching off 1.
    pub fn line_morphology() -> Morphology {
        let mut segments = vec![Segment {
            id: 0,
            name: Some("soma".into()),
            neuro_lex_id: None,
            parent: None,
            proximal: Some(point(0.0)),
            distal: point(10.0),
        }];
        for (id, parent, x) in [(1, 0, 20.0), (2, 1, 30.0), (3, 2, 40.0), (4, 1, 25.0)] {
            segments.push(Segment {
                id,
                name: None,
                neuro_lex_id: None,
                parent: Some(SegmentParent { segment: parent, fraction_along: None }),
                proximal: None,
                distal: point(x),
            });
        }
        Morphology { id: "morphology".into(), segments, segment_groups: vec![] }
    }

    #[test]
    fn path_lengths_accumulate_from_root() {
        let lengths = line_morphology().path_lengths();
        assert_eq!(lengths[&0], 10.0);
        assert_eq!(lengths[&1], 20.0);
        assert_eq!(lengths[&3], 40.0);
        assert_eq!(lengths[&4], 25.0);
    }

    #[test]
    fn branches_start_part_way_along_their_parent() {
        let mut m = line_morphology();
        m.segments.truncate(1);
        m.segments.push(Segment {
            id: 1,
            name: None,
            neuro_lex_id: None,
            parent: Some(SegmentParent { segment: 0, fraction_along: Some(0.5) }),
            proximal: Some(Point3DWithDiam { x: 5.0, y: 0.0, z: 0.0, diameter: 1.0 }),
            distal: Point3DWithDiam { x: 5.0, y: 10.0, z: 0.0, diameter: 1.0 },
        });
        m.segments.push(Segment {
            id: 2,
            name: None,
            neuro_lex_id: None,
            parent: Some(SegmentParent { segment: 1, fraction_along: Some(0.0) }),
            proximal: Some(Point3DWithDiam { x: 5.0, y: 0.0, z: 0.0, diameter: 1.0 }),
            distal: Point3DWithDiam { x: 5.0, y: 0.0, z: 4.0, diameter: 1.0 },
        });
        let lengths = m.path_lengths();
        assert_eq!(lengths[&0], 10.0);
        assert_eq!(lengths[&1], 15.0);
        assert_eq!(lengths[&2], 9.0);
    }

    #[test]
    fn resolve_members_follows_includes_paths_and_subtrees() {
        let mut m = line_morphology();
        let mut a = SegmentGroup::new("a");
        a.members = vec![0];
        let mut b = SegmentGroup::new("b");
        b.paths.push(SegmentPath { from: Some(2), to: Some(3) });
        let mut c = SegmentGroup::new("c");
        c.sub_trees.push(SubTree { from: Some(4), to: None });
        c.include("a");
        c.include("b");
        m.segment_groups = vec![a, b, c];
        assert_eq!(
            m.resolve_members("c").unwrap().into_iter().collect::<Vec<_>>(),
            vec![0, 2, 3, 4]
        );
    }

    #[test]
    fn resolve_members_reports_unknown_group() {
        let mut m = line_morphology();
        let mut a = SegmentGroup::new("a");
        a.include("ghost");
        m.segment_groups = vec![a];
        assert!(matches!(
            m.resolve_members("a"),
            Err(AssemblyError::UnknownSegmentGroup(g)) if g == "ghost"
        ));
    }

    #[test]
    fn reorder_places_included_groups_first() {
        let mut m = line_morphology();
        let mut dendrite = SegmentGroup::new("dendrite");
        dendrite.include("apical");
        dendrite.include("basal");
        let mut apical = SegmentGroup::new("apical");
        apical.include("f1");
        m.segment_groups = vec![
            dendrite,
            apical,
            SegmentGroup::new("basal"),
            SegmentGroup::new("f1"),
        ];
        m.reorder_segment_groups().unwrap();
        let ids: Vec<&str> = m.segment_groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["basal", "f1", "apical", "dendrite"]);
    }

    #[test]
    fn reorder_rejects_cycles() {
        let mut m = line_morphology();
        let mut a = SegmentGroup::new("a");
        a.include("b");
        let mut b = SegmentGroup::new("b");
        b.include("a");
        m.segment_groups = vec![a, b];
        assert!(matches!(m.reorder_segment_groups(), Err(AssemblyError::IncludeCycle(_))));
        assert_eq!(m.segment_groups.len(), 2);
    }

    #[test]
    fn ensure_group_reuses_existing() {
        let mut m = line_morphology();
        m.ensure_group(SegmentGroup::new("soma_group")).members.push(0);
        m.ensure_group(SegmentGroup::new("soma_group").with_notes("ignored"));
        assert_eq!(m.segment_groups.len(), 1);
        assert_eq!(m.segment_groups[0].members, vec![0]);
        assert_eq!(m.segment_groups[0].notes, None);
    }

    #[test]
    fn document_includes_are_deduplicated() {
        let mut d = Document::default();
        d.add_include("channels/pas.channel.nml");
        d.add_include("channels/Ih.channel.nml");
        d.add_include("channels/pas.channel.nml");
        assert_eq!(d.includes.len(), 2);
        assert!(matches!(d.cell(), Err(AssemblyError::NoCell)));
    }
}

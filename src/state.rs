//! The collapse state and the solver loop.
//!
//! A [`WfcState`] owns a working copy of the output graph, the
//! admissibility tables (per-node colors, per-occurrence patterns), the
//! entropy index and the seeded random source. Its lifecycle is
//! construct → [`WfcState::run`] → on [`Outcome::Failed`] optionally
//! [`WfcState::reset`] and run again. [`WfcState::observe`] and
//! [`WfcState::propagate`] are the two halves of one iteration and are
//! public so callers can drive the loop themselves.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use ordered_float::NotNan;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::EdgeType;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::debug;

use crate::error::{Contradiction, Location, WfcError};
use crate::iso::{occurrences_per_shape, Iso, IsoId, ShapeGraph};
use crate::pattern::{ColorId, PatternTable};

/// How an occurrence's entropy is computed from its admissible patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntropyMode {
    /// Distinct probability values only: patterns with equal counts
    /// contribute a single term. Not Shannon entropy whenever counts
    /// coincide, but kept as the default because the tie-breaking of
    /// observation order depends on these exact values.
    #[default]
    Dedup,
    /// Weighted Shannon entropy over all admissible patterns.
    Shannon,
}

/// Construction knobs.
#[derive(Debug, Clone, Copy)]
pub struct WfcOptions {
    /// Seed of the state's random source. Two states built from equal
    /// inputs and equal seeds make identical decisions.
    pub seed: u64,
    pub entropy: EntropyMode,
}

impl Default for WfcOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            entropy: EntropyMode::Dedup,
        }
    }
}

/// How a finished [`WfcState::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every occurrence is pinned to a single pattern and every visible
    /// node is colored.
    Done,
    /// An admissibility set emptied. [`WfcState::reset`] allows another
    /// attempt.
    Failed(Location),
    /// The iteration budget ran out first. State is coherent; `run` may
    /// simply be called again.
    Paused,
}

/// One occurrence held in the flat arena: its shape and its node tuple
/// in working-graph indices.
struct IsoEntry {
    shape: usize,
    nodes: Box<[NodeIndex]>,
}

/// Node-side view of the containment relation: an occurrence holding
/// the node, and at which tuple position.
#[derive(Debug, Clone, Copy)]
struct Slot {
    iso: usize,
    pos: usize,
}

/// Everything needed to run wave function collapse on one output graph.
pub struct WfcState<C, E, Ty: EdgeType> {
    patterns: Arc<PatternTable<C>>,
    entries: Vec<IsoEntry>,
    slots_per_node: Vec<Vec<Slot>>,
    /// Working copy of the output graph, colored in place as nodes
    /// collapse. Invisible nodes are already removed.
    go: Graph<Option<C>, E, Ty>,
    go_backup: Graph<Option<C>, E, Ty>,
    /// Pre-colored working nodes and their interned colors.
    preset: Vec<(usize, ColorId)>,
    invisible: Vec<NodeIndex>,
    values: Vec<FixedBitSet>,
    assigned: Vec<Option<ColorId>>,
    allowed: Vec<FixedBitSet>,
    entropies: Vec<NotNan<f64>>,
    entropy_mode: EntropyMode,
    rng: Pcg32,
    iterations: u64,
    last_contradiction: Option<Location>,
}

fn zero() -> NotNan<f64> {
    NotNan::new(0.0).expect("zero is not NaN")
}

impl<C, E, Ty> WfcState<C, E, Ty>
where
    C: Clone + Eq + Hash,
    E: Clone,
    Ty: EdgeType,
{
    /// Builds a state from the three input graphs, extracting patterns
    /// and enumerating occurrences along the way.
    pub fn new(
        output: &Graph<Option<C>, E, Ty>,
        example: &Graph<C, E, Ty>,
        shapes: &[ShapeGraph<E, Ty>],
    ) -> Result<Self, WfcError>
    where
        E: PartialEq,
    {
        Self::with_options(output, example, shapes, WfcOptions::default())
    }

    /// [`WfcState::new`] with an explicit seed and entropy mode.
    pub fn with_options(
        output: &Graph<Option<C>, E, Ty>,
        example: &Graph<C, E, Ty>,
        shapes: &[ShapeGraph<E, Ty>],
        options: WfcOptions,
    ) -> Result<Self, WfcError>
    where
        E: PartialEq,
    {
        let table = PatternTable::extract(example, shapes)?;
        let occurrences = occurrences_per_shape(output, shapes)?;
        Self::from_tables(output, Arc::new(table), occurrences, options)
    }

    /// The cache constructor: takes a previously extracted pattern
    /// table and previously enumerated output-graph occurrences, so
    /// neither the example graph nor the shapes are needed again. A
    /// table is shareable between states via its `Arc`.
    pub fn from_tables(
        output: &Graph<Option<C>, E, Ty>,
        patterns: Arc<PatternTable<C>>,
        occurrences: Vec<Vec<Iso>>,
        options: WfcOptions,
    ) -> Result<Self, WfcError> {
        if patterns.shape_count() == 0 {
            return Err(WfcError::NoShapes);
        }
        if occurrences.len() != patterns.shape_count() {
            return Err(WfcError::ShapeCountMismatch {
                expected: patterns.shape_count(),
                got: occurrences.len(),
            });
        }

        // Which nodes does any occurrence touch at all?
        let node_count = output.node_count();
        let mut visible = FixedBitSet::with_capacity(node_count);
        for (shape, isos) in occurrences.iter().enumerate() {
            let shape_patterns = patterns.shape(shape);
            for iso in isos {
                if !shape_patterns.is_empty() && iso.len() != shape_patterns.arity() {
                    return Err(WfcError::ArityMismatch {
                        shape,
                        expected: shape_patterns.arity(),
                        got: iso.len(),
                    });
                }
                for &node in iso {
                    if node.index() >= node_count {
                        return Err(WfcError::NodeOutOfBounds {
                            shape,
                            node: node.index(),
                        });
                    }
                    visible.insert(node.index());
                }
            }
        }

        let invisible: Vec<NodeIndex> = output
            .node_indices()
            .filter(|node| !visible.contains(node.index()))
            .collect();
        if !invisible.is_empty() {
            debug!(
                count = invisible.len(),
                "removing nodes that lie in no shape occurrence"
            );
        }

        // Pre-colored visible nodes must use colors the patterns know.
        let mut preset_colors = Vec::new();
        for node in output.node_indices() {
            if !visible.contains(node.index()) {
                continue;
            }
            if let Some(color) = &output[node] {
                let id = patterns
                    .colors()
                    .id_of(color)
                    .ok_or(WfcError::UnknownPresetColor { node })?;
                preset_colors.push((node, id));
            }
        }

        // Compact working copy without the invisible nodes; remap the
        // occurrence tuples into its indices.
        let mut remap: Vec<Option<NodeIndex>> = vec![None; node_count];
        let mut next = 0usize;
        let go_backup = output.filter_map(
            |node, weight| {
                if visible.contains(node.index()) {
                    remap[node.index()] = Some(NodeIndex::new(next));
                    next += 1;
                    Some(weight.clone())
                } else {
                    None
                }
            },
            |_, edge| Some(edge.clone()),
        );

        let mut entries = Vec::new();
        for (shape, isos) in occurrences.iter().enumerate() {
            for iso in isos {
                let nodes = iso
                    .iter()
                    .map(|&node| remap[node.index()].expect("occurrence nodes are visible"))
                    .collect();
                entries.push(IsoEntry { shape, nodes });
            }
        }
        let mut slots_per_node: Vec<Vec<Slot>> = vec![Vec::new(); go_backup.node_count()];
        for (iso, entry) in entries.iter().enumerate() {
            for (pos, &node) in entry.nodes.iter().enumerate() {
                slots_per_node[node.index()].push(Slot { iso, pos });
            }
        }
        let preset = preset_colors
            .into_iter()
            .map(|(node, id)| {
                let mapped = remap[node.index()].expect("preset nodes are visible");
                (mapped.index(), id)
            })
            .collect();

        let mut state = WfcState {
            patterns,
            entries,
            slots_per_node,
            go: go_backup.clone(),
            go_backup,
            preset,
            invisible,
            values: Vec::new(),
            assigned: Vec::new(),
            allowed: Vec::new(),
            entropies: Vec::new(),
            entropy_mode: options.entropy,
            rng: Pcg32::seed_from_u64(options.seed),
            iterations: 0,
            last_contradiction: None,
        };
        state.reset()?;
        Ok(state)
    }

    /// Restores the state right after construction: full admissibility
    /// sets, preset colors re-applied, initial propagation re-run.
    ///
    /// Not called automatically after a failed run, so that the
    /// contradiction can still be inspected. The random source is *not*
    /// reseeded; consecutive attempts draw fresh randomness.
    pub fn reset(&mut self) -> Result<(), WfcError> {
        self.go = self.go_backup.clone();
        let color_count = self.patterns.colors().len();
        let node_count = self.go.node_count();

        let mut all_colors = FixedBitSet::with_capacity(color_count);
        all_colors.set_range(.., true);
        self.values = vec![all_colors; node_count];
        self.assigned = vec![None; node_count];
        self.allowed = self
            .entries
            .iter()
            .map(|entry| {
                let mut all = FixedBitSet::with_capacity(self.patterns.shape(entry.shape).len());
                all.set_range(.., true);
                all
            })
            .collect();
        let entropies: Vec<NotNan<f64>> = (0..self.entries.len())
            .map(|iso| self.entropy_of(iso))
            .collect();
        self.entropies = entropies;
        self.iterations = 0;
        self.last_contradiction = None;

        // Preset colors enter the fixed point as forced singletons, so
        // their removals reach the occurrence side like any other.
        let mut forced: HashMap<usize, FixedBitSet> = HashMap::new();
        for &(node, id) in &self.preset {
            let mut only = FixedBitSet::with_capacity(color_count);
            only.insert(id as usize);
            forced.insert(node, only);
        }

        self.propagate_inner((0..node_count).collect(), &forced)
            .map_err(|contradiction| WfcError::Unsolvable {
                location: contradiction.location,
            })
    }

    /// Runs observation and propagation until done, contradicted, or
    /// out of budget. A negative budget means unbounded; a budget of 0
    /// returns [`Outcome::Paused`] without touching anything.
    pub fn run(&mut self, budget: i64) -> Outcome {
        let mut budget = budget;
        while budget != 0 {
            self.iterations += 1;
            let iso = match self.observe() {
                Some(iso) => iso,
                None => return Outcome::Done,
            };
            let seeds = self.entries[iso.index()].nodes.to_vec();
            if let Err(contradiction) = self.propagate(seeds) {
                return Outcome::Failed(contradiction.location);
            }
            budget -= 1;
        }
        Outcome::Paused
    }

    /// Pins the lowest-entropy unresolved occurrence to one pattern,
    /// sampled with probability proportional to the pattern counts.
    /// Ties for the minimum are broken uniformly. Returns `None` once
    /// every occurrence is resolved.
    ///
    /// The caller is expected to follow up with
    /// `propagate(iso_nodes(..))`; [`WfcState::run`] does exactly that.
    pub fn observe(&mut self) -> Option<IsoId> {
        let mut minimum: Option<NotNan<f64>> = None;
        let mut candidates: Vec<usize> = Vec::new();
        for (iso, &entropy) in self.entropies.iter().enumerate() {
            if entropy > zero() {
                match minimum {
                    Some(min) if entropy > min => {}
                    Some(min) if entropy == min => candidates.push(iso),
                    _ => {
                        minimum = Some(entropy);
                        candidates.clear();
                        candidates.push(iso);
                    }
                }
            }
        }
        let &iso = candidates.choose(&mut self.rng)?;

        let shape = self.patterns.shape(self.entries[iso].shape);
        let admissible: Vec<usize> = self.allowed[iso].ones().collect();
        let weights: Vec<u32> = admissible.iter().map(|&p| shape.count(p)).collect();
        let distribution = WeightedIndex::new(&weights).expect("pattern counts are positive");
        let pattern = admissible[distribution.sample(&mut self.rng)];

        let set = &mut self.allowed[iso];
        set.clear();
        set.insert(pattern);
        self.entropies[iso] = zero();
        Some(IsoId(iso))
    }

    /// Shrinks the admissibility tables to a mutual fixed point,
    /// starting from the given dirty nodes. On a contradiction the
    /// state keeps the shrunken tables; only [`WfcState::reset`] makes
    /// it solvable-looking again.
    pub fn propagate<I>(&mut self, seeds: I) -> Result<(), Contradiction>
    where
        I: IntoIterator<Item = NodeIndex>,
    {
        let seeds = seeds.into_iter().map(|node| node.index()).collect();
        let result = self.propagate_inner(seeds, &HashMap::new());
        if let Err(contradiction) = &result {
            self.last_contradiction = Some(contradiction.location);
        }
        result
    }

    /// Worklist fixed point: dirty nodes shrink their color sets from
    /// the pattern projections, shrunken nodes dirty their occurrences,
    /// shrunken occurrences dirty their nodes, until nothing moves.
    /// `forced` pins extra per-node restrictions into the node step.
    fn propagate_inner(
        &mut self,
        seeds: Vec<usize>,
        forced: &HashMap<usize, FixedBitSet>,
    ) -> Result<(), Contradiction> {
        let mut pending = FixedBitSet::with_capacity(self.go.node_count());
        let mut queue: Vec<usize> = Vec::new();
        for node in seeds {
            if !pending.contains(node) {
                pending.insert(node);
                queue.push(node);
            }
        }
        while !queue.is_empty() {
            let (dirty_isos, removed) = self.propagate_nodes(&mut queue, &mut pending, forced)?;
            self.propagate_isos(&dirty_isos, &removed, &mut queue, &mut pending)?;
        }
        Ok(())
    }

    /// Node half of the fixed point. Returns the occurrences to
    /// revisit and, per shrunken node, the colors that went away.
    fn propagate_nodes(
        &mut self,
        queue: &mut Vec<usize>,
        pending: &mut FixedBitSet,
        forced: &HashMap<usize, FixedBitSet>,
    ) -> Result<(FixedBitSet, HashMap<usize, FixedBitSet>), Contradiction> {
        let mut dirty_isos = FixedBitSet::with_capacity(self.entries.len());
        let mut removed: HashMap<usize, FixedBitSet> = HashMap::new();
        while let Some(node) = queue.pop() {
            pending.set(node, false);
            let mut new_colors = self.fitting_values(node);
            if let Some(restriction) = forced.get(&node) {
                new_colors.intersect_with(restriction);
            }
            let old_len = self.values[node].count_ones(..);
            let new_len = new_colors.count_ones(..);
            if new_len < old_len {
                let mut gone = self.values[node].clone();
                gone.difference_with(&new_colors);
                removed.insert(node, gone);
                self.values[node] = new_colors;
                for slot in &self.slots_per_node[node] {
                    dirty_isos.insert(slot.iso);
                }
            }
            if new_len == 0 {
                return Err(Contradiction {
                    location: Location::Node(NodeIndex::new(node)),
                });
            }
            if new_len == 1 && self.assigned[node].is_none() {
                let id = self.values[node].ones().next().expect("set is a singleton") as ColorId;
                self.assigned[node] = Some(id);
                let index = NodeIndex::new(node);
                if self.go[index].is_none() {
                    let color = self.patterns.colors().resolve(id).clone();
                    self.go[index] = Some(color);
                }
            }
        }
        Ok((dirty_isos, removed))
    }

    /// Occurrence half of the fixed point: drop every pattern that uses
    /// a removed color at the position of the node it was removed from,
    /// refresh entropies, and re-dirty the nodes of shrunken
    /// occurrences.
    fn propagate_isos(
        &mut self,
        dirty_isos: &FixedBitSet,
        removed: &HashMap<usize, FixedBitSet>,
        queue: &mut Vec<usize>,
        pending: &mut FixedBitSet,
    ) -> Result<(), Contradiction> {
        for iso in dirty_isos.ones() {
            let old_len = self.allowed[iso].count_ones(..);
            let mut kept = self.allowed[iso].clone();
            {
                let entry = &self.entries[iso];
                let shape = self.patterns.shape(entry.shape);
                for pattern in self.allowed[iso].ones() {
                    let tuple = shape.tuple(pattern);
                    let dead = entry.nodes.iter().enumerate().any(|(pos, node)| {
                        removed
                            .get(&node.index())
                            .map_or(false, |gone| gone.contains(tuple[pos] as usize))
                    });
                    if dead {
                        kept.set(pattern, false);
                    }
                }
            }
            let new_len = kept.count_ones(..);
            if new_len == 0 {
                return Err(Contradiction {
                    location: Location::Iso(IsoId(iso)),
                });
            }
            if new_len < old_len {
                self.allowed[iso] = kept;
                let entropy = self.entropy_of(iso);
                self.entropies[iso] = entropy;
                for &node in self.entries[iso].nodes.iter() {
                    if !pending.contains(node.index()) {
                        pending.insert(node.index());
                        queue.push(node.index());
                    }
                }
            }
        }
        Ok(())
    }

    /// The colors a node may still take: its current set intersected
    /// with the projection of every containing occurrence's admissible
    /// patterns at the node's position.
    fn fitting_values(&self, node: usize) -> FixedBitSet {
        let mut result = self.values[node].clone();
        let mut projection = FixedBitSet::with_capacity(self.patterns.colors().len());
        for slot in &self.slots_per_node[node] {
            projection.clear();
            let entry = &self.entries[slot.iso];
            let shape = self.patterns.shape(entry.shape);
            for pattern in self.allowed[slot.iso].ones() {
                projection.insert(shape.tuple(pattern)[slot.pos] as usize);
            }
            result.intersect_with(&projection);
        }
        result
    }

    /// Entropy of one occurrence under the current admissible set and
    /// the configured [`EntropyMode`]. Singletons and empty sets have
    /// entropy 0.
    fn entropy_of(&self, iso: usize) -> NotNan<f64> {
        let allowed = &self.allowed[iso];
        if allowed.count_ones(..) <= 1 {
            return zero();
        }
        let shape = self.patterns.shape(self.entries[iso].shape);
        let mut counts: Vec<u32> = allowed.ones().map(|pattern| shape.count(pattern)).collect();
        let total: f64 = counts.iter().map(|&count| f64::from(count)).sum();
        if self.entropy_mode == EntropyMode::Dedup {
            counts.sort_unstable();
            counts.dedup();
        }
        let entropy = -counts
            .iter()
            .map(|&count| {
                let probability = f64::from(count) / total;
                probability * probability.ln()
            })
            .sum::<f64>();
        NotNan::new(entropy).expect("entropy is a finite sum")
    }

    /// The working output graph. Nodes get their color as they
    /// collapse; after a [`Outcome::Done`] run every node is `Some`.
    pub fn graph(&self) -> &Graph<Option<C>, E, Ty> {
        &self.go
    }

    /// Consumes the state and hands over the working graph.
    pub fn into_graph(self) -> Graph<Option<C>, E, Ty> {
        self.go
    }

    /// Iterations of the run loop since the last reset.
    pub fn iteration_count(&self) -> u64 {
        self.iterations
    }

    /// Nodes of the original output graph that no occurrence touches.
    /// They are absent from [`WfcState::graph`] and never get a color.
    pub fn invisible_nodes(&self) -> &[NodeIndex] {
        &self.invisible
    }

    /// The shared pattern table, for building further states cheaply.
    pub fn pattern_table(&self) -> Arc<PatternTable<C>> {
        Arc::clone(&self.patterns)
    }

    /// Where the most recent contradiction was detected, if any.
    pub fn last_contradiction(&self) -> Option<Location> {
        self.last_contradiction
    }

    /// The finalized color of a working-graph node, once its
    /// admissible set is a singleton.
    pub fn color_of(&self, node: NodeIndex) -> Option<&C> {
        self.assigned[node.index()].map(|id| self.patterns.colors().resolve(id))
    }

    /// The currently admissible colors of a working-graph node.
    pub fn admissible_colors(&self, node: NodeIndex) -> Vec<&C> {
        self.values[node.index()]
            .ones()
            .map(|id| self.patterns.colors().resolve(id as ColorId))
            .collect()
    }

    /// Handles of all occurrences in the working graph.
    pub fn iso_ids(&self) -> impl Iterator<Item = IsoId> + '_ {
        (0..self.entries.len()).map(IsoId)
    }

    /// Index of the shape an occurrence belongs to.
    pub fn iso_shape(&self, iso: IsoId) -> usize {
        self.entries[iso.index()].shape
    }

    /// The node tuple of an occurrence, in working-graph indices.
    pub fn iso_nodes(&self, iso: IsoId) -> &[NodeIndex] {
        &self.entries[iso.index()].nodes
    }

    /// The currently admissible patterns of an occurrence, as color
    /// tuples.
    pub fn admissible_patterns(&self, iso: IsoId) -> Vec<Vec<&C>> {
        let shape = self.patterns.shape(self.entries[iso.index()].shape);
        self.allowed[iso.index()]
            .ones()
            .map(|pattern| {
                shape
                    .tuple(pattern)
                    .iter()
                    .map(|&id| self.patterns.colors().resolve(id))
                    .collect()
            })
            .collect()
    }

    pub fn admissible_pattern_count(&self, iso: IsoId) -> usize {
        self.allowed[iso.index()].count_ones(..)
    }

    /// Current entropy of one occurrence.
    pub fn entropy(&self, iso: IsoId) -> f64 {
        self.entropies[iso.index()].into_inner()
    }

    /// Sum of all occurrence entropies. Strictly decreases at every
    /// observation; under [`EntropyMode::Shannon`] it is also
    /// non-increasing across propagation in practice.
    pub fn entropy_sum(&self) -> f64 {
        self.entropies.iter().map(|h| h.into_inner()).sum()
    }
}

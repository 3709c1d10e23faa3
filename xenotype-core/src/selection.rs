use log::debug;

use crate::catalog::{Catalog, GeneDef, GeneId};
use crate::eligibility::{is_allowed, Overrides};
use crate::obscurity::{obscurity, ConflictRuns};
use crate::rng::RandomSource;
use crate::RandomiserSettings;

/// Genes chosen for one xenotype. Set semantics; insertion order is kept only
/// so output is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection<'a> {
    genes: Vec<&'a GeneDef>,
}

impl<'a> Selection<'a> {
    pub fn new() -> Self {
        Self { genes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.genes.iter().any(|g| g.def_name.as_str() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a GeneDef> + '_ {
        self.genes.iter().copied()
    }

    /// Returns false when the gene was already present.
    pub fn insert(&mut self, gene: &'a GeneDef) -> bool {
        if self.contains(gene.def_name.as_str()) {
            return false;
        }
        self.genes.push(gene);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.genes.len();
        self.genes.retain(|g| g.def_name.as_str() != id);
        self.genes.len() != before
    }

    pub fn retain(&mut self, keep: impl FnMut(&&'a GeneDef) -> bool) {
        self.genes.retain(keep);
    }

    pub fn clear(&mut self) {
        self.genes.clear();
    }

    /// Totals saturate instead of overflowing on extreme catalogs.
    pub fn total_complexity(&self) -> u32 {
        self.genes
            .iter()
            .fold(0u32, |acc, g| acc.saturating_add(g.complexity))
    }

    pub fn total_metabolism(&self) -> i32 {
        self.genes
            .iter()
            .fold(0i32, |acc, g| acc.saturating_add(g.metabolism))
    }

    pub fn total_archite(&self) -> u32 {
        self.genes
            .iter()
            .fold(0u32, |acc, g| acc.saturating_add(g.archite))
    }
}

impl<'a> FromIterator<&'a GeneDef> for Selection<'a> {
    fn from_iter<T: IntoIterator<Item = &'a GeneDef>>(iter: T) -> Self {
        let mut selection = Selection::new();
        for gene in iter {
            selection.insert(gene);
        }
        selection
    }
}

/// One sweep over the gene pool. Each eligible gene is taken with probability
/// `1 / obscurity`, pulls in its prerequisite, and evicts whatever it
/// conflicts with.
pub(crate) fn selection_pass<'a, R>(
    catalog: &'a Catalog,
    settings: &RandomiserSettings,
    overrides: Overrides,
    rng: &mut R,
) -> Selection<'a>
where
    R: RandomSource + ?Sized,
{
    let mut selection = Selection::new();
    let mut drawn = 0usize;
    let mut evicted = 0usize;

    for (gene, position) in ConflictRuns::new(catalog.pool(settings.complexity_cap())) {
        let prereq = catalog.prerequisite_of(gene);
        if !is_allowed(gene, settings, overrides, false) {
            continue;
        }
        if let Some(prereq) = prereq {
            if !is_allowed(prereq, settings, overrides, false) {
                continue;
            }
        }

        let weight = obscurity(gene, position, catalog) as usize;
        if rng.below(weight) != 0 {
            continue;
        }
        drawn += 1;

        if !selection.insert(gene) {
            continue;
        }
        let mut inserted = vec![gene];
        if let Some(prereq) = prereq {
            if selection.insert(prereq) {
                inserted.push(prereq);
            }
        }

        evicted += evict_conflicts(&mut selection, &inserted);
    }

    debug!(
        "selection pass: {} drawn, {} evicted, {} kept",
        drawn,
        evicted,
        selection.len()
    );
    selection
}

/// Drops members conflicting with any of `inserted`, then any member left
/// without its prerequisite. Returns the number of genes removed.
fn evict_conflicts(selection: &mut Selection<'_>, inserted: &[&GeneDef]) -> usize {
    let before = selection.len();
    selection.retain(|member| !inserted.iter().any(|new| new.conflicts_with(member)));

    let present: Vec<GeneId> = selection.iter().map(|g| g.def_name.clone()).collect();
    selection.retain(|member| {
        member
            .prerequisite
            .as_ref()
            .map_or(true, |p| present.contains(p))
    });

    before - selection.len()
}

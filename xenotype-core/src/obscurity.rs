use crate::catalog::{Catalog, GeneDef};

const PREREQUISITE_WEIGHT: u32 = 20;
const RUN_POSITION_WEIGHT: u32 = 2;

/// Inclusion weight for a gene: a gene is drawn with probability
/// `1 / obscurity`. Never zero since `position` starts at 1; saturates at
/// `u32::MAX`.
pub fn obscurity(gene: &GeneDef, position: u32, catalog: &Catalog) -> u32 {
    let mut score = gene
        .complexity
        .saturating_add(gene.metabolism.unsigned_abs())
        .saturating_add(RUN_POSITION_WEIGHT.saturating_mul(position.max(1)));
    if gene.prerequisite.is_some() {
        score = score.saturating_add(PREREQUISITE_WEIGHT);
    }
    if catalog.is_prerequisite(gene.def_name.as_str()) {
        score = score.saturating_add(PREREQUISITE_WEIGHT);
    }
    score
}

/// Walks an ordered gene sequence yielding each gene with its 1-based position
/// inside the current run of consecutive conflicting genes.
pub struct ConflictRuns<'a, I> {
    genes: I,
    previous: Option<&'a GeneDef>,
    position: u32,
}

impl<'a, I> ConflictRuns<'a, I>
where
    I: Iterator<Item = &'a GeneDef>,
{
    pub fn new(genes: I) -> Self {
        Self {
            genes,
            previous: None,
            position: 0,
        }
    }
}

impl<'a, I> Iterator for ConflictRuns<'a, I>
where
    I: Iterator<Item = &'a GeneDef>,
{
    type Item = (&'a GeneDef, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let gene = self.genes.next()?;
        self.position = match self.previous {
            Some(prev) if gene.conflicts_with(prev) => self.position + 1,
            _ => 1,
        };
        self.previous = Some(gene);
        Some((gene, self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_reset_outside_conflict_runs() {
        let genes = vec![
            GeneDef::new("Hair_A").with_exclusion_tag("Hair"),
            GeneDef::new("Hair_B").with_exclusion_tag("Hair"),
            GeneDef::new("Hair_C").with_exclusion_tag("Hair"),
            GeneDef::new("Robust"),
            GeneDef::new("Ears_A").with_exclusion_tag("Ears"),
            GeneDef::new("Ears_B").with_exclusion_tag("Ears"),
        ];
        let positions: Vec<u32> = ConflictRuns::new(genes.iter()).map(|(_, pos)| pos).collect();
        assert_eq!(positions, vec![1, 2, 3, 1, 1, 2]);
    }

    #[test]
    fn scores_prerequisite_relations() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Root").with_complexity(2).with_metabolism(-3),
            GeneDef::new("Leaf").with_complexity(1).with_prerequisite("Root"),
            GeneDef::new("Plain"),
        ])
        .unwrap();
        let root = catalog.get("Root").unwrap();
        let leaf = catalog.get("Leaf").unwrap();
        let plain = catalog.get("Plain").unwrap();

        assert_eq!(obscurity(root, 1, &catalog), 2 + 3 + 2 + 20);
        assert_eq!(obscurity(leaf, 2, &catalog), 1 + 4 + 20);
        assert_eq!(obscurity(plain, 1, &catalog), 2);
    }

    #[test]
    fn score_is_always_positive() {
        let catalog = Catalog::new(vec![GeneDef::new("Zero")]).unwrap();
        let zero = catalog.get("Zero").unwrap();
        assert!(obscurity(zero, 0, &catalog) > 0);
    }

    #[test]
    fn extreme_costs_saturate() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Huge").with_complexity(u32::MAX).with_metabolism(i32::MIN),
            GeneDef::new("Leaf").with_prerequisite("Huge"),
        ])
        .unwrap();
        let huge = catalog.get("Huge").unwrap();
        assert_eq!(obscurity(huge, u32::MAX, &catalog), u32::MAX);
    }
}

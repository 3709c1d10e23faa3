use log::{debug, info};
use thiserror::Error;

use crate::catalog::{Catalog, GeneDef, GeneId};
use crate::eligibility::{is_allowed, Overrides};
use crate::rng::RandomSource;
use crate::selection::Selection;
use crate::{RandomiserError, RandomiserSettings, Result};

/// A trim pass leaves roughly this many genes at most.
const TRIM_KEEP: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub trimmed: usize,
    pub budget_used: usize,
    /// Budget ran out (or no removal could make progress) and the selection
    /// was discarded.
    pub exhausted: bool,
}

/// A constraint the final selection still breaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("no genes selected")]
    Empty,

    #[error("'{a}' conflicts with '{b}'")]
    Conflict { a: GeneId, b: GeneId },

    #[error("'{gene}' is missing its prerequisite '{prerequisite}'")]
    MissingPrerequisite { gene: GeneId, prerequisite: GeneId },

    #[error("'{gene}' is disallowed by the current settings")]
    Disallowed { gene: GeneId },

    #[error("total complexity {total} exceeds the maximum of {cap}")]
    ComplexityOverCap { total: u32, cap: u32 },

    #[error("total metabolism {total} is outside {min}..={max}")]
    MetabolismOutOfRange { total: i32, min: i32, max: i32 },
}

fn removable_ids(selection: &Selection<'_>, catalog: &Catalog, keep: impl Fn(&GeneDef) -> bool) -> Vec<GeneId> {
    selection
        .iter()
        .filter(|g| !catalog.is_prerequisite(g.def_name.as_str()) && keep(*g))
        .map(|g| g.def_name.clone())
        .collect()
}

/// Removes a random number of genes from `[len - 20, len]`, never touching
/// genes that something in the catalog depends on.
fn trim_pass<R>(selection: &mut Selection<'_>, catalog: &Catalog, rng: &mut R) -> usize
where
    R: RandomSource + ?Sized,
{
    let len = selection.len();
    let target = rng.inclusive(len.saturating_sub(TRIM_KEEP), len);
    let mut candidates = removable_ids(selection, catalog, |_| true);

    let mut removed = 0;
    while removed < target && !candidates.is_empty() {
        let id = candidates.swap_remove(rng.below(candidates.len()));
        if selection.remove(id.as_str()) {
            removed += 1;
        }
    }
    removed
}

/// Prunes `selection` until it fits the complexity cap and metabolism range.
/// Every loop iteration spends one unit of the shared budget; running out at
/// any stage clears the selection.
pub(crate) fn repair<R>(
    selection: &mut Selection<'_>,
    catalog: &Catalog,
    settings: &RandomiserSettings,
    rng: &mut R,
) -> RepairReport
where
    R: RandomSource + ?Sized,
{
    let mut report = RepairReport::default();
    let budget = settings.repair_budget;

    report.trimmed += trim_pass(selection, catalog, rng);

    if let Some(cap) = settings.complexity_cap() {
        while selection.total_complexity() > cap {
            if report.budget_used >= budget {
                return exhaust(selection, report, "complexity");
            }
            report.budget_used += 1;
            report.trimmed += trim_pass(selection, catalog, rng);
        }
    }

    let range = settings.metabolism;
    loop {
        let total = selection.total_metabolism();
        let candidates = if total < range.min {
            removable_ids(selection, catalog, |g| g.metabolism < 0)
        } else if total > range.max {
            removable_ids(selection, catalog, |g| g.metabolism > 0)
        } else {
            break;
        };

        if candidates.is_empty() || report.budget_used >= budget {
            return exhaust(selection, report, "metabolism");
        }
        report.budget_used += 1;
        let id = &candidates[rng.below(candidates.len())];
        selection.remove(id.as_str());
    }

    debug!(
        "repair converged: {} genes left, {} trimmed, {} budget used",
        selection.len(),
        report.trimmed,
        report.budget_used
    );
    report
}

fn exhaust(selection: &mut Selection<'_>, mut report: RepairReport, stage: &str) -> RepairReport {
    debug!(
        "repair gave up during {} repair after {} iterations, discarding {} genes",
        stage,
        report.budget_used,
        selection.len()
    );
    selection.clear();
    report.exhausted = true;
    report
}

/// Puts a single root gene into an empty selection. Genes passing the normal
/// filter come first; desperate mode is the last resort.
pub(crate) fn fallback<'a, R>(
    selection: &mut Selection<'a>,
    catalog: &'a Catalog,
    settings: &RandomiserSettings,
    overrides: Overrides,
    rng: &mut R,
) -> Result<()>
where
    R: RandomSource + ?Sized,
{
    let roots = |desperate: bool| -> Vec<&'a GeneDef> {
        catalog
            .pool(settings.complexity_cap())
            .filter(|g| g.prerequisite.is_none() && is_allowed(g, settings, overrides, desperate))
            .collect()
    };

    let mut candidates = roots(false);
    let desperate = candidates.is_empty();
    if desperate {
        candidates = roots(true);
    }
    if candidates.is_empty() {
        return Err(RandomiserError::NoEligibleGene);
    }

    let gene = candidates[rng.below(candidates.len())];
    info!(
        "selection came out empty, falling back to '{}'{}",
        gene.def_name,
        if desperate { " (desperate)" } else { "" }
    );
    selection.insert(gene);
    Ok(())
}

/// Every invariant the selection breaks.
pub fn validate(
    selection: &Selection<'_>,
    settings: &RandomiserSettings,
    overrides: Overrides,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    if selection.is_empty() {
        violations.push(Violation::Empty);
    }

    let genes: Vec<&GeneDef> = selection.iter().collect();
    for (i, a) in genes.iter().enumerate() {
        for b in &genes[i + 1..] {
            if a.conflicts_with(b) {
                violations.push(Violation::Conflict {
                    a: a.def_name.clone(),
                    b: b.def_name.clone(),
                });
            }
        }
        if let Some(prereq) = &a.prerequisite {
            if !selection.contains(prereq.as_str()) {
                violations.push(Violation::MissingPrerequisite {
                    gene: a.def_name.clone(),
                    prerequisite: prereq.clone(),
                });
            }
        }
        if !is_allowed(a, settings, overrides, false) {
            violations.push(Violation::Disallowed {
                gene: a.def_name.clone(),
            });
        }
    }

    if let Some(cap) = settings.complexity_cap() {
        let total = selection.total_complexity();
        if total > cap {
            violations.push(Violation::ComplexityOverCap { total, cap });
        }
    }

    let total = selection.total_metabolism();
    if !settings.metabolism.contains(total) {
        violations.push(Violation::MetabolismOutOfRange {
            total,
            min: settings.metabolism.min,
            max: settings.metabolism.max,
        });
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedSource;
    use crate::IntRange;

    fn open_settings() -> RandomiserSettings {
        let mut settings = RandomiserSettings::default();
        settings.allow_all();
        settings
    }

    fn all<'a>(catalog: &'a Catalog) -> Selection<'a> {
        catalog.genes().iter().collect()
    }

    fn names<'a>(selection: &Selection<'a>) -> Vec<&'a str> {
        selection.iter().map(|g| g.def_name.as_str()).collect()
    }

    #[test]
    fn removes_positive_genes_when_over_maximum() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Hunger").with_metabolism(10),
            GeneDef::new("Robust").with_metabolism(-2),
        ])
        .unwrap();
        let mut selection = all(&catalog);
        let report = repair(&mut selection, &catalog, &open_settings(), &mut ScriptedSource::zeros());
        assert!(!report.exhausted);
        assert_eq!(names(&selection), vec!["Robust"]);
        assert_eq!(report.budget_used, 1);
    }

    #[test]
    fn removes_negative_genes_when_under_minimum() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Hunger").with_metabolism(1),
            GeneDef::new("Psy").with_metabolism(-8),
        ])
        .unwrap();
        let mut selection = all(&catalog);
        let report = repair(&mut selection, &catalog, &open_settings(), &mut ScriptedSource::zeros());
        assert!(!report.exhausted);
        assert_eq!(names(&selection), vec!["Hunger"]);
    }

    #[test]
    fn trims_until_under_complexity_cap() {
        let catalog = Catalog::new(vec![
            GeneDef::new("A").with_complexity(3),
            GeneDef::new("B").with_complexity(3),
            GeneDef::new("C").with_complexity(3),
        ])
        .unwrap();
        let mut settings = open_settings();
        settings.max_complexity = Some(5);
        let mut selection = all(&catalog);
        // First trim removes nothing, the second removes two genes.
        let mut rng = ScriptedSource::new(&[0, 2, 0, 0]);
        let report = repair(&mut selection, &catalog, &settings, &mut rng);
        assert!(!report.exhausted);
        assert_eq!(selection.len(), 1);
        assert!(selection.total_complexity() <= 5);
        assert_eq!(report.trimmed, 2);
    }

    #[test]
    fn prerequisites_are_never_trimmed() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Root"),
            GeneDef::new("Leaf").with_prerequisite("Root"),
            GeneDef::new("Loose"),
        ])
        .unwrap();
        let mut selection = all(&catalog);
        let removed = trim_pass(&mut selection, &catalog, &mut ScriptedSource::new(&[3]));
        assert_eq!(removed, 2);
        assert_eq!(names(&selection), vec!["Root"]);
    }

    #[test]
    fn stuck_metabolism_discards_everything() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Root").with_metabolism(10),
            GeneDef::new("Leaf").with_prerequisite("Root"),
        ])
        .unwrap();
        let mut selection = all(&catalog);
        let report = repair(&mut selection, &catalog, &open_settings(), &mut ScriptedSource::zeros());
        assert!(report.exhausted);
        assert!(selection.is_empty());
    }

    #[test]
    fn budget_runs_out_during_complexity_repair() {
        let catalog = Catalog::new(vec![
            GeneDef::new("A").with_complexity(4),
            GeneDef::new("B").with_complexity(4),
        ])
        .unwrap();
        let mut settings = open_settings();
        settings.max_complexity = Some(5);
        settings.repair_budget = 5;
        let mut selection = all(&catalog);
        // Zero draws never trim anything, so the loop spins until the budget is gone.
        let report = repair(&mut selection, &catalog, &settings, &mut ScriptedSource::zeros());
        assert!(report.exhausted);
        assert_eq!(report.budget_used, 5);
        assert!(selection.is_empty());
    }

    #[test]
    fn fallback_prefers_allowed_roots() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Banned"),
            GeneDef::new("Root"),
            GeneDef::new("Leaf").with_prerequisite("Root"),
        ])
        .unwrap();
        let mut settings = open_settings();
        settings.set_allowed("Banned", false);
        let mut selection = Selection::new();
        fallback(&mut selection, &catalog, &settings, Overrides::default(), &mut ScriptedSource::zeros()).unwrap();
        assert_eq!(names(&selection), vec!["Root"]);
    }

    #[test]
    fn fallback_goes_desperate_then_fails() {
        let catalog = Catalog::new(vec![GeneDef::new("Banned"), GeneDef::new("Archite").with_archite(3)]).unwrap();
        let mut settings = open_settings();
        settings.set_allowed("Banned", false);
        let mut selection = Selection::new();
        fallback(&mut selection, &catalog, &settings, Overrides::default(), &mut ScriptedSource::zeros()).unwrap();
        assert_eq!(names(&selection), vec!["Banned"]);

        let archite_only = Catalog::new(vec![GeneDef::new("Archite").with_archite(3)]).unwrap();
        let mut selection = Selection::new();
        let err = fallback(&mut selection, &archite_only, &settings, Overrides::default(), &mut ScriptedSource::zeros())
            .unwrap_err();
        assert!(matches!(err, RandomiserError::NoEligibleGene));
        assert!(selection.is_empty());
    }

    #[test]
    fn validate_reports_each_broken_invariant() {
        let catalog = Catalog::new(vec![
            GeneDef::new("Red").with_exclusion_tag("Hair").with_complexity(4),
            GeneDef::new("Blue").with_exclusion_tag("Hair").with_metabolism(9),
            GeneDef::new("Root"),
            GeneDef::new("Leaf").with_prerequisite("Root"),
        ])
        .unwrap();
        let mut settings = open_settings();
        settings.max_complexity = Some(3);
        settings.metabolism = IntRange::new(-5, 5);
        settings.set_allowed("Blue", false);

        let selection: Selection = ["Red", "Blue", "Leaf"]
            .iter()
            .filter_map(|id| catalog.get(id))
            .collect();
        let violations = validate(&selection, &settings, Overrides::default());

        assert!(violations.contains(&Violation::Conflict {
            a: GeneId::new("Red"),
            b: GeneId::new("Blue"),
        }));
        assert!(violations.contains(&Violation::MissingPrerequisite {
            gene: GeneId::new("Leaf"),
            prerequisite: GeneId::new("Root"),
        }));
        assert!(violations.contains(&Violation::Disallowed { gene: GeneId::new("Blue") }));
        assert!(violations.contains(&Violation::ComplexityOverCap { total: 4, cap: 3 }));
        assert!(violations.contains(&Violation::MetabolismOutOfRange { total: 9, min: -5, max: 5 }));
        assert!(validate(&Selection::new(), &settings, Overrides::default()).contains(&Violation::Empty));
    }
}

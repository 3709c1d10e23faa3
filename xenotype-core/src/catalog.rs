use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// The one gene targeted by the inbred override channel.
pub const INBRED: &str = "Inbred";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneId(String);

impl GeneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for GeneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GeneId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Static description of a gene. Only `def_name` is required in catalog
/// documents; everything else defaults to zero / empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneDef {
    pub def_name: GeneId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub complexity: u32,
    #[serde(default)]
    pub metabolism: i32,
    #[serde(default)]
    pub archite: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisite: Option<GeneId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusion_tags: Vec<String>,
    /// Gene disables violent work.
    #[serde(default)]
    pub nonviolent: bool,
    #[serde(default)]
    pub display_order: f32,
}

impl GeneDef {
    pub fn new(def_name: impl Into<String>) -> Self {
        Self {
            def_name: GeneId::new(def_name),
            label: None,
            complexity: 0,
            metabolism: 0,
            archite: 0,
            prerequisite: None,
            exclusion_tags: Vec::new(),
            nonviolent: false,
            display_order: 0.0,
        }
    }

    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_metabolism(mut self, metabolism: i32) -> Self {
        self.metabolism = metabolism;
        self
    }

    pub fn with_archite(mut self, archite: u32) -> Self {
        self.archite = archite;
        self
    }

    pub fn with_prerequisite(mut self, prerequisite: &str) -> Self {
        self.prerequisite = Some(GeneId::new(prerequisite));
        self
    }

    pub fn with_exclusion_tag(mut self, tag: &str) -> Self {
        self.exclusion_tags.push(tag.to_string());
        self
    }

    pub fn with_nonviolent(mut self) -> Self {
        self.nonviolent = true;
        self
    }

    pub fn with_display_order(mut self, order: f32) -> Self {
        self.display_order = order;
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.def_name.as_str())
    }

    pub fn is_inbred(&self) -> bool {
        self.def_name.as_str() == INBRED
    }

    /// Two distinct genes conflict when they share an exclusion tag.
    pub fn conflicts_with(&self, other: &GeneDef) -> bool {
        if self.def_name == other.def_name {
            return false;
        }
        self.exclusion_tags
            .iter()
            .any(|tag| other.exclusion_tags.contains(tag))
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("gene '{id}' is defined more than once")]
    DuplicateGene { id: GeneId },

    #[error("gene '{gene}' requires unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite { gene: GeneId, prerequisite: GeneId },

    #[error("gene '{gene}' lists itself as its prerequisite")]
    SelfPrerequisite { gene: GeneId },

    #[error("gene '{gene}' requires '{prerequisite}', which has a prerequisite of its own")]
    NestedPrerequisite { gene: GeneId, prerequisite: GeneId },

    #[error("gene '{gene}' conflicts with its own prerequisite '{prerequisite}'")]
    ConflictingPrerequisite { gene: GeneId, prerequisite: GeneId },
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    genes: Vec<GeneDef>,
}

/// Read-only gene registry in canonical order (ascending `display_order`,
/// ties in source order), with an id index and a reverse-dependency index.
#[derive(Debug, Clone)]
pub struct Catalog {
    genes: Vec<GeneDef>,
    index: HashMap<GeneId, usize>,
    dependents: HashMap<GeneId, Vec<GeneId>>,
}

impl Catalog {
    pub fn new(mut genes: Vec<GeneDef>) -> std::result::Result<Self, CatalogError> {
        genes.sort_by(|a, b| a.display_order.total_cmp(&b.display_order));

        let mut index = HashMap::with_capacity(genes.len());
        for (pos, gene) in genes.iter().enumerate() {
            if index.insert(gene.def_name.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateGene {
                    id: gene.def_name.clone(),
                });
            }
        }

        let mut dependents: HashMap<GeneId, Vec<GeneId>> = HashMap::new();
        for gene in &genes {
            let Some(prereq_id) = &gene.prerequisite else {
                continue;
            };
            if *prereq_id == gene.def_name {
                return Err(CatalogError::SelfPrerequisite {
                    gene: gene.def_name.clone(),
                });
            }
            let Some(&prereq_pos) = index.get(prereq_id) else {
                return Err(CatalogError::UnknownPrerequisite {
                    gene: gene.def_name.clone(),
                    prerequisite: prereq_id.clone(),
                });
            };
            let prereq = &genes[prereq_pos];
            if prereq.prerequisite.is_some() {
                return Err(CatalogError::NestedPrerequisite {
                    gene: gene.def_name.clone(),
                    prerequisite: prereq_id.clone(),
                });
            }
            if gene.conflicts_with(prereq) {
                return Err(CatalogError::ConflictingPrerequisite {
                    gene: gene.def_name.clone(),
                    prerequisite: prereq_id.clone(),
                });
            }
            dependents
                .entry(prereq_id.clone())
                .or_default()
                .push(gene.def_name.clone());
        }

        Ok(Self {
            genes,
            index,
            dependents,
        })
    }

    pub fn from_json_str(data: &str) -> crate::Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(data)?;
        Ok(Self::new(doc.genes)?)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn genes(&self) -> &[GeneDef] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GeneDef> {
        self.index.get(id).map(|&pos| &self.genes[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn prerequisite_of(&self, gene: &GeneDef) -> Option<&GeneDef> {
        gene.prerequisite.as_ref().and_then(|id| self.get(id.as_str()))
    }

    /// Genes naming `id` as their prerequisite.
    pub fn dependents(&self, id: &str) -> &[GeneId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_prerequisite(&self, id: &str) -> bool {
        !self.dependents(id).is_empty()
    }

    /// Conflict test by id; unknown ids never conflict.
    pub fn conflicts(&self, a: &str, b: &str) -> bool {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => a.conflicts_with(b),
            _ => false,
        }
    }

    /// Genes the randomiser may draw from: no archite cost, and no single gene
    /// costlier than the complexity cap.
    pub fn pool(&self, complexity_cap: Option<u32>) -> impl Iterator<Item = &GeneDef> + '_ {
        self.genes.iter().filter(move |gene| {
            gene.archite == 0 && complexity_cap.map_or(true, |cap| gene.complexity <= cap)
        })
    }
}

use crate::selection::Selection;

pub const DEFAULT_ICON: &str = "Basic";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IconRule {
    pub gene: &'static str,
    pub icon: &'static str,
}

/// Checked top to bottom; the first gene present picks the icon.
pub const ICON_RULES: &[IconRule] = &[
    IconRule {
        gene: "Hair_LongOnly",
        icon: "Crown",
    },
    IconRule {
        gene: "Headbone_CenterHorn",
        icon: "Horn",
    },
    IconRule {
        gene: "Ears_Pig",
        icon: "Ears",
    },
    IconRule {
        gene: "Skin_Green",
        icon: "Frown",
    },
    IconRule {
        gene: "Body_Hulk",
        icon: "Skull",
    },
    IconRule {
        gene: "Head_Gaunt",
        icon: "SkullThin",
    },
    IconRule {
        gene: "Ears_Cat",
        icon: "Crescent",
    },
    IconRule {
        gene: "Ears_Floppy",
        icon: "Lop",
    },
    IconRule {
        gene: "Beauty_VeryUgly",
        icon: "Rect",
    },
    IconRule {
        gene: "Furskin",
        icon: "Furred",
    },
];

pub fn resolve_icon(selection: &Selection<'_>) -> &'static str {
    ICON_RULES
        .iter()
        .find(|rule| selection.contains(rule.gene))
        .map_or(DEFAULT_ICON, |rule| rule.icon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GeneDef;

    #[test]
    fn falls_back_to_basic() {
        let robust = GeneDef::new("Robust");
        let selection: Selection = [&robust].into_iter().collect();
        assert_eq!(resolve_icon(&selection), DEFAULT_ICON);
        assert_eq!(resolve_icon(&Selection::new()), DEFAULT_ICON);
    }

    #[test]
    fn earlier_rules_win_regardless_of_insertion_order() {
        let fur = GeneDef::new("Furskin");
        let horn = GeneDef::new("Headbone_CenterHorn");
        let a: Selection = [&fur, &horn].into_iter().collect();
        let b: Selection = [&horn, &fur].into_iter().collect();
        assert_eq!(resolve_icon(&a), "Horn");
        assert_eq!(resolve_icon(&b), "Horn");
        assert_eq!(resolve_icon(&a), resolve_icon(&a));
    }

    #[test]
    fn every_rule_is_reachable() {
        for rule in ICON_RULES {
            let gene = GeneDef::new(rule.gene);
            let selection: Selection = [&gene].into_iter().collect();
            assert_eq!(resolve_icon(&selection), rule.icon);
        }
    }
}

//! Taxonomy validation of parsed items.

use tracing::warn;

use crate::pipeline::parse::TaggedItem;
use crate::types::taxonomy::Taxonomy;

/// Items split by whether their label is in the taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub accepted: Vec<TaggedItem>,

    /// Labels of dropped items, in response order (repeats kept)
    pub unknown_tags: Vec<String>,
}

impl ValidationOutcome {
    pub fn dropped(&self) -> usize {
        self.unknown_tags.len()
    }
}

/// Keep items whose tag exactly matches a focus point name.
///
/// Unknown labels are dropped, never corrected: a model inventing a label
/// is a quality problem to count, not to repair.
pub fn validate_tags(items: Vec<TaggedItem>, taxonomy: &Taxonomy) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    for item in items {
        if taxonomy.contains(&item.tag) {
            outcome.accepted.push(item);
        } else {
            warn!(tag = %item.tag, "Dropping item with tag outside taxonomy");
            outcome.unknown_tags.push(item.tag);
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::taxonomy::FocusPoint;

    fn taxonomy() -> Taxonomy {
        Taxonomy::new([
            FocusPoint::new("Policy Release", "new government policies"),
            FocusPoint::new("Funding", "budgets and grants"),
        ])
        .unwrap()
    }

    #[test]
    fn test_unknown_tag_dropped() {
        let outcome = validate_tags(
            vec![TaggedItem::new("Rumor", "Something happened.")],
            &taxonomy(),
        );
        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.dropped(), 1);
        assert_eq!(outcome.unknown_tags, vec!["Rumor"]);
    }

    #[test]
    fn test_match_is_exact_and_case_sensitive() {
        let items = vec![
            TaggedItem::new("Funding", "City approved the parks budget"),
            TaggedItem::new("funding", "Lowercase label is not the same"),
            TaggedItem::new("Policy  Release", "Extra space is not the same"),
            TaggedItem::new("Policy Release", "Province issued school guidance"),
        ];
        let outcome = validate_tags(items, &taxonomy());
        let tags: Vec<_> = outcome.accepted.iter().map(|i| i.tag.as_str()).collect();
        assert_eq!(tags, vec!["Funding", "Policy Release"]);
        assert_eq!(outcome.dropped(), 2);
    }
}

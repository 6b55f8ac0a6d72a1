//! Drift detection between a user checklist and a reference template.
//!
//! # Responsibility
//! - Decide whether a user's checklist copy is consistent with a reference
//!   template version.
//!
//! # Invariants
//! - Pure comparison over loaded rows; no storage access, no side effects.
//! - Items match across versions by `display_text`, the only identity that
//!   survives re-publishing a template (item row ids change per version).

use crate::model::template::TemplateWithItems;
use crate::model::user_checklist::UserChecklistWithItems;
use std::collections::HashSet;

/// Returns whether `user_checklist` has drifted from `reference`.
///
/// A copy is malformed when its referenced item texts are not set-equal to
/// the reference template's item texts, or when a matched pair disagrees on
/// link metadata (`link_text`/`link_uri`). The link check guards against
/// template edits that changed a link without changing the item text.
pub fn is_malformed(user_checklist: &UserChecklistWithItems, reference: &TemplateWithItems) -> bool {
    let reference_texts: HashSet<&str> = reference
        .items
        .iter()
        .map(|item| item.display_text.as_str())
        .collect();
    let copy_texts: HashSet<&str> = user_checklist
        .items
        .iter()
        .map(|view| view.template_item.display_text.as_str())
        .collect();
    if reference_texts.len() != copy_texts.len() {
        return true;
    }

    for reference_item in &reference.items {
        let matching = match user_checklist
            .items
            .iter()
            .find(|view| view.template_item.display_text == reference_item.display_text)
        {
            Some(matching) => matching,
            None => return true,
        };
        if matching.template_item.link_text != reference_item.link_text {
            return true;
        }
        if matching.template_item.link_uri != reference_item.link_uri {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::is_malformed;
    use crate::model::template::{ChecklistTemplate, ChecklistTemplateItem, TemplateWithItems};
    use crate::model::user_checklist::{
        UserChecklist, UserChecklistItem, UserChecklistItemView, UserChecklistWithItems,
    };

    fn template(items: &[(&str, &str)]) -> TemplateWithItems {
        TemplateWithItems {
            template: ChecklistTemplate {
                id: 1,
                name: "Job Search".to_string(),
                version: "2024-01-01".to_string(),
                is_premium: false,
                pretty_route: None,
                created_at: 0,
            },
            items: items
                .iter()
                .enumerate()
                .map(|(index, (display_text, link_uri))| ChecklistTemplateItem {
                    id: index as i64 + 1,
                    template_id: 1,
                    display_text: display_text.to_string(),
                    detail_text: String::new(),
                    is_required: true,
                    link_text: String::new(),
                    link_uri: link_uri.to_string(),
                    display_index: index as i64,
                })
                .collect(),
        }
    }

    fn copy_of(template: &TemplateWithItems) -> UserChecklistWithItems {
        UserChecklistWithItems {
            checklist: UserChecklist {
                id: 10,
                user_id: 7,
                template_id: template.template.id,
                is_complete: false,
                created_at: 0,
            },
            items: template
                .items
                .iter()
                .enumerate()
                .map(|(index, template_item)| UserChecklistItemView {
                    item: UserChecklistItem {
                        id: index as i64 + 100,
                        user_checklist_id: 10,
                        template_item_id: template_item.id,
                        user_id: 7,
                        is_complete: false,
                    },
                    template_item: template_item.clone(),
                })
                .collect(),
        }
    }

    #[test]
    fn copy_of_same_template_is_well_formed() {
        let reference = template(&[("Write resume", ""), ("Apply to 10 jobs", "")]);
        let copy = copy_of(&reference);
        assert!(!is_malformed(&copy, &reference));
    }

    #[test]
    fn changed_display_text_is_malformed() {
        let old = template(&[("Write resume", ""), ("Apply to 10 jobs", "")]);
        let new = template(&[("Write a resume", ""), ("Apply to 10 jobs", "")]);
        let copy = copy_of(&old);
        assert!(is_malformed(&copy, &new));
    }

    #[test]
    fn changed_link_uri_with_same_text_is_malformed() {
        let old = template(&[("Write resume", "https://a.example")]);
        let new = template(&[("Write resume", "https://b.example")]);
        let copy = copy_of(&old);
        assert!(is_malformed(&copy, &new));
    }

    #[test]
    fn missing_and_extra_items_are_malformed() {
        let reference = template(&[("Write resume", ""), ("Apply to 10 jobs", "")]);
        let shorter = template(&[("Write resume", "")]);

        let short_copy = copy_of(&shorter);
        assert!(is_malformed(&short_copy, &reference));

        let long_copy = copy_of(&reference);
        assert!(is_malformed(&long_copy, &shorter));
    }
}

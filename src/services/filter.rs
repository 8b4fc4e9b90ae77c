use std::collections::HashSet;

use crate::models::{normalize_title, Catalog, CatalogItem, UserProfile};

/// Collects normalized forms of the given titles into an exclusion set
pub fn normalized_set<I, S>(titles: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    titles
        .into_iter()
        .map(|t| normalize_title(t.as_ref()))
        .collect()
}

/// Removes items the user has already seen, explicitly disliked, or excluded
/// for the current call.
///
/// Title comparison uses the normalized form, so a dubbed/subtitled variant of
/// an excluded title is excluded too. Dislike rules match their column value
/// as a literal, case-sensitive substring; values are never interpreted as
/// pattern syntax. Returns a fresh borrowed view in catalog order; the source
/// catalog is never mutated.
pub fn filter<'a>(
    catalog: &'a Catalog,
    profile: &UserProfile,
    extra_exclude: &HashSet<String>,
) -> Vec<&'a CatalogItem> {
    catalog
        .items()
        .iter()
        .filter(|item| {
            let normalized = normalize_title(&item.title);
            if profile.is_excluded_title(&normalized) || extra_exclude.contains(&normalized) {
                return false;
            }
            !profile.dislike_rules.iter().any(|rule| {
                item.field_text(&rule.column)
                    .is_some_and(|text| text.contains(&rule.value))
            })
        })
        .collect()
}

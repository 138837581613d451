//! Filter expressions for Algolia browse and query requests.

use crate::content::ContentId;
use crate::provider::SearchQuery;
use crate::transform::CONTENT_ID_FIELD;

/// Content ids folded into one browse filter.
pub const CONTENT_ID_FILTER_GROUP: usize = 100;

/// Build `contentID:1 OR contentID:2` expressions, at most `group` ids each.
pub fn content_id_filters(content_ids: &[ContentId], group: usize) -> Vec<String> {
    content_ids
        .chunks(group.max(1))
        .map(|ids| {
            ids.iter()
                .map(|id| format!("{CONTENT_ID_FIELD}:{id}"))
                .collect::<Vec<_>>()
                .join(" OR ")
        })
        .collect()
}

/// Compose the facet filter for a search query's type and taxonomy refinements.
pub fn build_search_filter(query: &SearchQuery) -> Option<String> {
    let mut clauses = Vec::new();

    if let Some(clause) = any_of("type", &query.content_types) {
        clauses.push(clause);
    }

    for (slug, terms) in &query.taxonomy_terms {
        if let Some(clause) = any_of(&format!("taxonomy.{slug}"), terms) {
            clauses.push(clause);
        }
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" AND "))
    }
}

fn any_of(attribute: &str, values: &[String]) -> Option<String> {
    let values: Vec<String> = values
        .iter()
        .filter_map(|value| non_empty(value))
        .map(|value| format!("{attribute}:{}", quote(value)))
        .collect();
    match values.len() {
        0 => None,
        1 => values.into_iter().next(),
        _ => Some(format!("({})", values.join(" OR "))),
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_filters_group_ids() {
        assert_eq!(
            content_id_filters(&[1, 2, 3], 2),
            vec![
                "contentID:1 OR contentID:2".to_string(),
                "contentID:3".to_string()
            ]
        );
        assert!(content_id_filters(&[], 10).is_empty());
    }

    #[test]
    fn build_search_filter_combines_types_and_terms() {
        let mut query = SearchQuery::new("rust");
        query.content_types = vec!["post".into(), "page".into()];
        query
            .taxonomy_terms
            .insert("category".into(), vec!["Say \"hi\"".into()]);

        assert_eq!(
            build_search_filter(&query).as_deref(),
            Some(r#"(type:"post" OR type:"page") AND taxonomy.category:"Say \"hi\"""#)
        );
    }

    #[test]
    fn build_search_filter_ignores_blank_refinements() {
        let mut query = SearchQuery::new("rust");
        query.content_types = vec![" ".into()];
        query.taxonomy_terms.insert("post_tag".into(), vec![]);
        assert!(build_search_filter(&query).is_none());
    }
}

//! Heuristic header -> role mapping.

use letterkit_text::normalize_header_text;

use crate::spec::{EnumFieldRole, MappingError, SpecColumnMapperOptions, SpecFieldMapping};

/// Map raw headers to semantic roles.
///
/// For each rule, in order:
/// 1. the first header (declaration order) whose normalized text equals a synonym;
/// 2. otherwise the first header whose normalized text contains a synonym.
///
/// When the group role is still unresolved, the first header containing a
/// fallback keyword is used. Unresolved roles stay unset; this never fails.
pub fn map_columns(headers: &[String], options: &SpecColumnMapperOptions) -> SpecFieldMapping {
    let l_norm: Vec<String> = headers.iter().map(|c| normalize_header_text(c)).collect();
    let mut l_pairs: Vec<(EnumFieldRole, String)> = Vec::new();

    for (role, l_synonyms) in &options.rules {
        if l_pairs.iter().any(|(role_seen, _)| role_seen == role) {
            continue;
        }
        let l_synonyms_norm: Vec<String> = l_synonyms
            .iter()
            .map(|c| normalize_header_text(c))
            .filter(|c| !c.is_empty())
            .collect();

        let n_idx_exact = l_norm
            .iter()
            .position(|c_header| l_synonyms_norm.iter().any(|c_syn| c_header == c_syn));
        let n_idx_found = n_idx_exact.or_else(|| {
            l_norm.iter().position(|c_header| {
                l_synonyms_norm
                    .iter()
                    .any(|c_syn| c_header.contains(c_syn.as_str()))
            })
        });

        if let Some(n_idx) = n_idx_found {
            tracing::debug!(
                role = role.as_str(),
                column = %headers[n_idx],
                exact = n_idx_exact.is_some(),
                "mapped column"
            );
            l_pairs.push((*role, headers[n_idx].clone()));
        }
    }

    if !l_pairs.iter().any(|(role, _)| *role == EnumFieldRole::Group) {
        let l_keywords: Vec<String> = options
            .group_fallback_keywords
            .iter()
            .map(|c| normalize_header_text(c))
            .filter(|c| !c.is_empty())
            .collect();
        let n_idx_fallback = l_norm.iter().position(|c_header| {
            l_keywords
                .iter()
                .any(|c_kw| c_header.contains(c_kw.as_str()))
        });
        if let Some(n_idx) = n_idx_fallback {
            tracing::debug!(column = %headers[n_idx], "mapped group column by keyword");
            l_pairs.push((EnumFieldRole::Group, headers[n_idx].clone()));
        }
    }

    l_pairs.into_iter().collect()
}

/// Suggested grouping columns: the actor column, then the group column if distinct.
pub fn auto_detect_group_fields(
    headers: &[String],
    options: &SpecColumnMapperOptions,
) -> Vec<String> {
    let mapping = map_columns(headers, options);
    let mut l_fields: Vec<String> = Vec::with_capacity(2);
    for role in [EnumFieldRole::Actor, EnumFieldRole::Group] {
        if let Some(c_col) = mapping.get(role)
            && !l_fields.iter().any(|c| c == c_col)
        {
            l_fields.push(c_col.to_string());
        }
    }
    l_fields
}

/// Check that every required role resolved.
pub fn validate_mapping(mapping: &SpecFieldMapping) -> Result<(), MappingError> {
    let roles = mapping.missing_required();
    if roles.is_empty() {
        Ok(())
    } else {
        Err(MappingError::MappingIncomplete { roles })
    }
}

//! De-templating: pair a matched route template with the live path.

use thiserror::Error;

use super::trie::{PLACEHOLDER_CLOSE, PLACEHOLDER_OPEN};
use crate::context::Parameters;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template '{template}' has {expected} segments but path '{path}' has {actual}")]
    SegmentCount {
        template: String,
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("malformed placeholder '{segment}' in template '{template}'")]
    MalformedPlaceholder { template: String, segment: String },
}

/// Recovers wildcard values by pairing template segment N with path segment N.
///
/// Literal template segments are skipped. A placeholder must be a whole
/// segment of the form `{{name}}` with a non-empty name that contains no
/// further braces; `{{a}}{{b}}` is rejected.
///
/// # Examples
///
/// ```
/// use quimby::router::detemplate;
///
/// let params = detemplate("users/{{id}}/posts/{{post}}", "users/7/posts/99").unwrap();
/// assert_eq!(params.get("id"), Some("7"));
/// assert_eq!(params.get("post"), Some("99"));
/// ```
pub fn detemplate(template: &str, path: &str) -> Result<Parameters, TemplateError> {
    let template_segments: Vec<&str> = template.split('/').collect();
    let path_segments: Vec<&str> = path.split('/').collect();

    if template_segments.len() != path_segments.len() {
        return Err(TemplateError::SegmentCount {
            template: template.to_owned(),
            path: path.to_owned(),
            expected: template_segments.len(),
            actual: path_segments.len(),
        });
    }

    let mut params = Parameters::new();
    for (segment, value) in template_segments.into_iter().zip(path_segments) {
        if !segment.starts_with(PLACEHOLDER_OPEN) {
            continue;
        }
        let name = placeholder_name(segment).ok_or_else(|| TemplateError::MalformedPlaceholder {
            template: template.to_owned(),
            segment: segment.to_owned(),
        })?;
        params.insert(name.to_owned(), value.to_owned());
    }
    Ok(params)
}

fn placeholder_name(segment: &str) -> Option<&str> {
    let name = segment
        .strip_prefix(PLACEHOLDER_OPEN)?
        .strip_suffix(PLACEHOLDER_CLOSE)?;
    let valid = !name.trim().is_empty() && !name.contains('{') && !name.contains('}');
    valid.then_some(name)
}

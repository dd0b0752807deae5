use std::collections::HashSet;

use crate::ModelInfo;

const CAPABILITY_KEYWORDS: [&str; 5] = ["generatecontent", "generate", "vision", "image", "gimg"];
const NAME_KEYWORDS: [&str; 3] = ["vision", "image", "gimg"];

/// Whether a model likely accepts an image and generates text.
///
/// Declared capabilities win; otherwise the name decides. Names starting with
/// `text-` are text-only unless they mention images.
pub fn likely_capable(model: &ModelInfo) -> bool {
    let declared = model.capabilities.iter().any(|capability| {
        let capability = capability.to_ascii_lowercase();
        CAPABILITY_KEYWORDS
            .iter()
            .any(|keyword| capability.contains(keyword))
    });
    if declared {
        return true;
    }

    let name = model.name.to_ascii_lowercase();
    NAME_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

/// Orders the fallback candidates: capable models first, then the rest, each
/// group in registry order. `primary` and duplicates are skipped and the list
/// is capped at `max`.
pub fn candidate_order(models: &[ModelInfo], primary: &str, max: usize) -> Vec<String> {
    let primary = bare_name(primary);
    let mut seen = HashSet::new();
    let unique: Vec<&ModelInfo> = models
        .iter()
        .filter(|model| !model.name.is_empty() && bare_name(&model.name) != primary)
        .filter(|model| seen.insert(bare_name(&model.name)))
        .collect();

    let (capable, rest): (Vec<&ModelInfo>, Vec<&ModelInfo>) =
        unique.into_iter().partition(|model| likely_capable(model));
    capable
        .into_iter()
        .chain(rest)
        .take(max)
        .map(|model| model.name.clone())
        .collect()
}

fn bare_name(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

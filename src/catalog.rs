use crate::models::{CatalogEntry, MatchResult, ThresholdStats};

/// Case-folds and strips the diacritics that appear in Portuguese program
/// names, so "Informática" and "informatica" compare equal.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(fold_diacritic)
        .flat_map(char::to_lowercase)
        .collect()
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Loose substring search over program names. Threshold statistics cover
/// only matched entries with a recorded `required_grade`; entries at 0 mean
/// "no historical threshold", not free admission. A blank query matches
/// nothing rather than the whole catalog.
pub fn find_programs(catalog: &[CatalogEntry], query: &str) -> MatchResult {
    let needle = normalize_text(query.trim());

    let matched_entries: Vec<CatalogEntry> = if needle.is_empty() {
        Vec::new()
    } else {
        catalog
            .iter()
            .filter(|entry| normalize_text(&entry.program_name).contains(&needle))
            .cloned()
            .collect()
    };

    let thresholds: Vec<f64> = matched_entries
        .iter()
        .map(|entry| entry.required_grade)
        .filter(|grade| *grade > 0.0)
        .collect();

    let stats = if thresholds.is_empty() {
        None
    } else {
        Some(ThresholdStats {
            min_required: thresholds.iter().copied().fold(f64::INFINITY, f64::min),
            max_required: thresholds.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg_required: thresholds.iter().sum::<f64>() / thresholds.len() as f64,
            sample_size: thresholds.len(),
        })
    };

    MatchResult {
        matched_entries,
        stats,
    }
}

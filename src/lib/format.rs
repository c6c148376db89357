use super::*;

/// The complete label of a candidate: `"<house number> <street> - <city> - <postcode>"`.
///
/// The house number and its separating space are left out when there is none.
pub fn full_address(candidate: &AddressCandidate) -> String {
    match candidate.house_number.as_deref() {
        Some(number) if !number.is_empty() => format!(
            "{} {} - {} - {}",
            number, candidate.street, candidate.city, candidate.postcode
        ),
        _ => format!(
            "{} - {} - {}",
            candidate.street, candidate.city, candidate.postcode
        ),
    }
}

/// The label shown in a proposal list, cut to at most `max_display_length` characters.
pub fn format_candidate(candidate: &AddressCandidate, max_display_length: usize) -> String {
    truncate_label(&full_address(candidate), max_display_length)
}

/// Cuts `label` to `max_len` characters without adding a marker.
/// Counts characters, so accented names are never split inside a code point.
pub fn truncate_label(label: &str, max_len: usize) -> String {
    match label.char_indices().nth(max_len) {
        Some((end, _)) => label[..end].to_string(),
        None => label.to_string(),
    }
}

#[cfg(test)]
fn rue_de_la_paix(house_number: Option<&str>) -> AddressCandidate {
    AddressCandidate::new(
        house_number.map(str::to_string),
        "Rue de la Paix",
        "Paris",
        "75002",
        Coordinates::new(2.331_09, 48.869_11),
    )
}

#[test]
fn format_with_and_without_house_number() {
    assert_eq!(
        format_candidate(&rue_de_la_paix(Some("12")), 45),
        "12 Rue de la Paix - Paris - 75002"
    );
    assert_eq!(
        format_candidate(&rue_de_la_paix(None), 45),
        "Rue de la Paix - Paris - 75002"
    );
    assert_eq!(
        format_candidate(&rue_de_la_paix(Some("")), 45),
        "Rue de la Paix - Paris - 75002"
    );
}

#[test]
fn long_labels_are_cut_to_max_length() {
    let candidate = AddressCandidate::new(
        Some("137".to_string()),
        "Avenue des Champs-Élysées prolongée",
        "Neuilly-sur-Seine",
        "92200",
        Coordinates::new(2.27, 48.88),
    );
    let full = full_address(&candidate);
    let label = format_candidate(&candidate, 45);

    assert!(full.chars().count() > 45);
    assert_eq!(label.chars().count(), 45);
    assert!(full.starts_with(&label));
}

#[test]
fn short_labels_are_untouched() {
    assert_eq!(truncate_label("Rue Éblé", 45), "Rue Éblé");
    assert_eq!(truncate_label("Rue Éblé", 5), "Rue É");
    assert_eq!(truncate_label("", 0), "");
}

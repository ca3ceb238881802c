//! Known SanctSound site codes and their human-friendly labels.

/// Sanctuary names keyed by two-letter site prefix.
const SANCTUARIES: &[(&str, &str)] = &[
    ("ci", "Channel Islands"),
    ("fk", "Florida Keys"),
    ("gr", "Gray's Reef"),
    ("hi", "Hawaiian Islands"),
    ("mb", "Monterey Bay"),
    ("oc", "Olympic Coast"),
    ("pm", "Papahānaumokuākea"),
    ("sb", "Stellwagen Bank"),
];

/// Site codes with published recordings, sorted.
pub const KNOWN_SITES: &[&str] = &[
    "ci01", "ci02", "ci03", "ci04", "ci05", "fk01", "fk02", "fk03", "fk04", "gr01", "gr02",
    "gr03", "hi01", "hi03", "hi04", "hi05", "hi06", "mb01", "mb02", "mb03", "oc01", "oc02",
    "oc03", "oc04", "pm01", "pm02", "pm05", "sb01", "sb02", "sb03",
];

/// Sanctuary name for a site code, if its prefix is known.
pub fn sanctuary_name(code: &str) -> Option<&'static str> {
    let prefix = code.trim().get(..2)?.to_ascii_lowercase();
    SANCTUARIES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, name)| *name)
}

/// Label such as `Channel Islands - CI01`.
pub fn label_for_code(code: &str) -> String {
    let code = code.trim().to_ascii_lowercase();
    let friendly = sanctuary_name(&code).map_or_else(
        || code.get(..2).unwrap_or(code.as_str()).to_ascii_uppercase(),
        str::to_string,
    );
    format!("{friendly} - {}", code.to_ascii_uppercase())
}

/// Inverse of [`label_for_code`]. Bare codes pass through lower-cased.
pub fn code_for_label(label: &str) -> String {
    label
        .rsplit(['-', '—'])
        .next()
        .unwrap_or(label)
        .trim()
        .to_ascii_lowercase()
}

/// Labels for every known site, ordered by code.
pub fn all_labels() -> Vec<String> {
    KNOWN_SITES.iter().map(|c| label_for_code(c)).collect()
}

/// Whether `code` is one of [`KNOWN_SITES`].
pub fn is_known(code: &str) -> bool {
    let code = code.trim().to_ascii_lowercase();
    KNOWN_SITES.contains(&code.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_for_known_code() {
        assert_eq!(label_for_code("ci01"), "Channel Islands - CI01");
        assert_eq!(label_for_code(" HI03 "), "Hawaiian Islands - HI03");
    }

    #[test]
    fn test_label_for_unknown_prefix() {
        assert_eq!(label_for_code("zz07"), "ZZ - ZZ07");
    }

    #[test]
    fn test_code_for_label_round_trip() {
        for code in KNOWN_SITES {
            assert_eq!(code_for_label(&label_for_code(code)), *code);
        }
        assert_eq!(code_for_label("Gray's Reef — GR02"), "gr02");
        assert_eq!(code_for_label("MB01"), "mb01");
    }

    #[test]
    fn test_known_sites_sorted() {
        let mut sorted = KNOWN_SITES.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, KNOWN_SITES);
        assert!(is_known("PM05"));
        assert!(!is_known("pm03"));
    }
}

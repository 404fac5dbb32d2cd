//! Line classification for newline-delimited knowledge files.

const SEPARATOR_MARKERS: [char; 6] = ['=', '-', '*', '_', '~', '#'];

/// How a single trimmed corpus line is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    Separator,
    /// Section header; switches the category for following lines
    Header(&'a str),
    Content(&'a str),
}

/// Classifies one line of corpus text.
///
/// Any line equal to its own uppercase form and longer than three characters
/// is a header. Short uppercase content such as "CNC MILL" or a bare part
/// number ("4410") is therefore swallowed as a header too; corpora rely on
/// this, so it is kept as is.
pub fn classify(line: &str) -> LineKind<'_> {
    let line = line.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }
    if is_separator(line) {
        return LineKind::Separator;
    }
    if line.chars().count() > 3 && line.to_uppercase() == line {
        return LineKind::Header(line);
    }
    LineKind::Content(line)
}

fn is_separator(line: &str) -> bool {
    line.chars().count() >= 3 && line.chars().all(|c| SEPARATOR_MARKERS.contains(&c))
}

/// Walks the corpus, yielding `(content, category)` for every storable line.
pub fn parse_lines<'a>(
    raw: &'a str,
    default_category: &'a str,
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    let mut category = default_category;
    raw.lines().filter_map(move |line| match classify(line) {
        LineKind::Header(name) => {
            category = name;
            None
        }
        LineKind::Content(content) => Some((content, category)),
        LineKind::Blank | LineKind::Separator => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("   "), LineKind::Blank);
        assert_eq!(classify("========"), LineKind::Separator);
        assert_eq!(classify("-=-=-=-"), LineKind::Separator);
        assert_eq!(classify("PRICING RULES:"), LineKind::Header("PRICING RULES:"));
        assert_eq!(classify("Aluminium costs less"), LineKind::Content("Aluminium costs less"));
        // three chars or fewer is never a header
        assert_eq!(classify("FAQ"), LineKind::Content("FAQ"));
        // known false positive
        assert_eq!(classify("CNC MILL"), LineKind::Header("CNC MILL"));
    }

    #[test]
    fn test_parse_tracks_category() {
        let raw = "intro line\nMATERIALS\n----\nsteel is strong\n\naluminium is light\nSHIPPING\nships in 3 days\n";
        let parsed: Vec<_> = parse_lines(raw, "general").collect();
        assert_eq!(
            parsed,
            vec![
                ("intro line", "general"),
                ("steel is strong", "MATERIALS"),
                ("aluminium is light", "MATERIALS"),
                ("ships in 3 days", "SHIPPING"),
            ]
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse_lines("", "general").count(), 0);
        assert_eq!(parse_lines("\n\n====\n", "general").count(), 0);
    }
}

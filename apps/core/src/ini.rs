//! Minimal `[section]` / `key=value` reader shared by desktop entries,
//! `mimeapps.list` and Firefox `profiles.ini`.
//!
//! Blank lines and lines starting with `#` or `;` are skipped. Keys keep
//! their original case; the first occurrence of a key in a section wins.
//! Lines before the first header land in a section with an empty name.

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn parse_sections(input: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section::default();

    for raw_line in input.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let finished = std::mem::replace(&mut current, Section::named(header.trim()));
            if !finished.name.is_empty() || !finished.is_empty() {
                sections.push(finished);
            }
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || current.get(key).is_some() {
            continue;
        }
        current
            .entries
            .push((key.to_string(), value.trim().to_string()));
    }

    // The trailing section has no header after it to close it.
    if !current.name.is_empty() || !current.is_empty() {
        sections.push(current);
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::parse_sections;

    #[test]
    fn keeps_trailing_section_without_newline() {
        let sections = parse_sections("[A]\nx=1\n[B]\ny=2");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].name, "B");
        assert_eq!(sections[1].get("y"), Some("2"));
    }

    #[test]
    fn skips_comments_and_keeps_first_duplicate_key() {
        let sections = parse_sections("# header\n[A]\n; note\nx = 1\nx=2\nnot a pair\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].get("x"), Some("1"));
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let sections = parse_sections("[Desktop Entry]\nExec=app --flag=value %u\n");
        assert_eq!(sections[0].get("Exec"), Some("app --flag=value %u"));
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(parse_sections("").is_empty());
        assert!(parse_sections("\n\n# only comments\n").is_empty());
    }
}

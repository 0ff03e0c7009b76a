use regex::Regex;
use std::sync::OnceLock;

/// A key pulled out of a file or folder name.
///
/// `qualifier` carries the secondary segment some naming conventions embed
/// next to the key (the plasmid number in `plasmid_job_rest.ab1`, the vector
/// in `vector._.job`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameKey {
    pub key: String,
    pub qualifier: Option<String>,
}

impl NameKey {
    fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            qualifier: None,
        }
    }
}

/// How a lab identifier is encoded in a name. Extraction is pure: the same
/// name always yields the same key and nothing is touched on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRule {
    /// The first `n` characters, e.g. a nine-digit work number.
    Prefix(usize),
    /// `plasmid_job_rest`: key is the job id (dots trimmed), qualifier the plasmid.
    UnderscoreSegments,
    /// `vector<delim>job[<delim>...]`: key is the job id, qualifier the vector.
    Delimited(String),
    /// Text before the first of the given characters.
    BaseName(Vec<char>),
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)_(.+?)_(.+)").expect("static pattern is valid"))
}

impl KeyRule {
    /// Reference-file base names: `ABC+primer.txt` and `ABC.1.txt` both give `ABC`.
    pub fn reference_base_name() -> Self {
        KeyRule::BaseName(vec!['+', '.'])
    }

    /// Folder base names: `ABC.BB12` gives `ABC`.
    pub fn folder_base_name() -> Self {
        KeyRule::BaseName(vec!['.'])
    }

    /// Returns `None` when the name does not follow the convention; callers
    /// skip such entries.
    pub fn extract(&self, name: &str) -> Option<NameKey> {
        match self {
            KeyRule::Prefix(len) => {
                let key: String = name.chars().take(*len).collect();
                if *len == 0 || key.chars().count() < *len {
                    None
                } else {
                    Some(NameKey::plain(key))
                }
            }
            KeyRule::UnderscoreSegments => {
                let captures = segment_pattern().captures(name)?;
                let plasmid = captures.get(1)?.as_str();
                let job_id = captures.get(2)?.as_str().trim_matches('.');
                if job_id.is_empty() {
                    return None;
                }
                Some(NameKey {
                    key: job_id.to_string(),
                    qualifier: Some(plasmid.to_string()),
                })
            }
            KeyRule::Delimited(delimiter) => {
                if delimiter.is_empty() || !name.contains(delimiter.as_str()) {
                    return None;
                }
                let mut parts = name.split(delimiter.as_str());
                let vector = parts.next()?;
                let job_id = parts.next()?;
                Some(NameKey {
                    key: job_id.to_string(),
                    qualifier: Some(vector.to_string()),
                })
            }
            KeyRule::BaseName(stops) => {
                let base = name
                    .split(|c: char| stops.contains(&c))
                    .next()
                    .unwrap_or_default();
                if base.is_empty() {
                    None
                } else {
                    Some(NameKey::plain(base))
                }
            }
        }
    }
}

/// Joins name segments with `.` so that no leading, trailing or doubled dots
/// appear, whatever the segments themselves contain at their edges.
pub fn join_dotted(segments: &[&str]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.trim().trim_matches('.'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".");

    let mut collapsed = String::with_capacity(joined.len());
    for ch in joined.chars() {
        if ch == '.' && collapsed.ends_with('.') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed
}

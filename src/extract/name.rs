use std::ops::Range;

use super::patterns::{
    COMMON_SURNAMES, COMPOUND_SURNAMES, LABELED_NAME_PATTERNS, NAME_BLOCKLIST, NAME_POISON,
    NAME_TRAILING_LABELS,
};
use crate::text::{char_len, is_all_cjk, is_cjk};

/// Name pattern families, tried in the order given by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFamily {
    /// Text after a label such as "姓名" or "name:".
    Labeled,
    /// CJK run directly before (preferred) or after the student id.
    IdAdjacent,
    /// CJK run at the very start of the text.
    Leading,
    /// First valid CJK run anywhere.
    Anywhere,
}

impl NameFamily {
    pub fn describe(&self) -> &'static str {
        match self {
            NameFamily::Labeled => "labeled",
            NameFamily::IdAdjacent => "next to id",
            NameFamily::Leading => "leading",
            NameFamily::Anywhere => "anywhere",
        }
    }
}

/// Families used on mail subjects, bodies and filenames.
pub const TEXT_NAME_FAMILIES: &[NameFamily] = &[
    NameFamily::Labeled,
    NameFamily::IdAdjacent,
    NameFamily::Leading,
];

/// Attachment names lead with the name or keep it next to the id.
pub const FILENAME_NAME_FAMILIES: &[NameFamily] = &[NameFamily::Leading, NameFamily::IdAdjacent];

/// Folder names carry no labels or sentence structure, so any run may do.
pub const FOLDER_NAME_FAMILIES: &[NameFamily] = &[
    NameFamily::Labeled,
    NameFamily::IdAdjacent,
    NameFamily::Leading,
    NameFamily::Anywhere,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub name: String,
    /// Byte span of the name in the scanned text.
    pub span: Range<usize>,
    pub family: NameFamily,
}

const NAME_SEPARATORS: &[char] = &[
    '-', '_', '.', ',', '，', ':', '：', '、', '+', '=', '。', '(', ')', '（', '）', '[', ']',
    '【', '】',
];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || NAME_SEPARATORS.contains(&c)
}

/// Does `candidate` look like a person's name rather than a generic phrase?
pub fn is_valid_name(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    if is_all_cjk(candidate) {
        return is_valid_cjk_name(candidate);
    }
    if candidate.chars().all(|c| c.is_ascii_alphabetic()) {
        return (2..=20).contains(&candidate.len())
            && !NAME_BLOCKLIST
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(candidate));
    }
    false
}

fn is_valid_cjk_name(candidate: &str) -> bool {
    let len = char_len(candidate);
    if !(2..=4).contains(&len)
        || NAME_BLOCKLIST.contains(&candidate)
        || NAME_POISON.iter().any(|poison| candidate.contains(poison))
    {
        return false;
    }
    // four characters only with a known surname
    if len == 4 {
        let common = candidate
            .chars()
            .next()
            .map_or(false, |c| COMMON_SURNAMES.contains(&c));
        return common || COMPOUND_SURNAMES.iter().any(|s| candidate.starts_with(s));
    }
    true
}

/// Find a name in `text` trying `families` in order. `id_span` is the byte
/// span of the accepted student id, if any.
pub fn find_name_with(
    text: &str,
    id_span: Option<&Range<usize>>,
    families: &[NameFamily],
) -> Option<NameMatch> {
    families.iter().find_map(|family| match family {
        NameFamily::Labeled => labeled_name(text),
        NameFamily::IdAdjacent => id_span.and_then(|span| id_adjacent_name(text, span)),
        NameFamily::Leading => leading_name(text),
        NameFamily::Anywhere => anywhere_name(text),
    })
}

fn strip_trailing_label(name: &str) -> &str {
    NAME_TRAILING_LABELS
        .iter()
        .find_map(|label| name.strip_suffix(label))
        .unwrap_or(name)
}

fn labeled_name(text: &str) -> Option<NameMatch> {
    for pattern in LABELED_NAME_PATTERNS.iter() {
        for caps in pattern.regex.captures_iter(text) {
            let Some(m) = caps.get(pattern.group) else {
                continue;
            };
            let name = strip_trailing_label(m.as_str());
            if is_valid_name(name) {
                return Some(NameMatch {
                    name: name.to_string(),
                    span: m.start()..m.start() + name.len(),
                    family: NameFamily::Labeled,
                });
            }
        }
    }
    None
}

fn leading_cjk_len(s: &str) -> usize {
    s.char_indices()
        .find(|(_, c)| !is_cjk(*c))
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

fn trailing_cjk_start(s: &str) -> usize {
    s.char_indices()
        .rev()
        .take_while(|(_, c)| is_cjk(*c))
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

fn id_adjacent_name(text: &str, id_span: &Range<usize>) -> Option<NameMatch> {
    let before = text[..id_span.start].trim_end_matches(is_separator);
    let start = trailing_cjk_start(before);
    if is_valid_name(&before[start..]) {
        return Some(NameMatch {
            name: before[start..].to_string(),
            span: start..before.len(),
            family: NameFamily::IdAdjacent,
        });
    }

    let after = &text[id_span.end..];
    let trimmed = after.trim_start_matches(is_separator);
    let start = id_span.end + (after.len() - trimmed.len());
    let len = leading_cjk_len(trimmed);
    if is_valid_name(&trimmed[..len]) {
        return Some(NameMatch {
            name: trimmed[..len].to_string(),
            span: start..start + len,
            family: NameFamily::IdAdjacent,
        });
    }
    None
}

fn leading_name(text: &str) -> Option<NameMatch> {
    let trimmed = text.trim_start_matches(is_separator);
    let start = text.len() - trimmed.len();
    let len = leading_cjk_len(trimmed);
    is_valid_name(&trimmed[..len]).then(|| NameMatch {
        name: trimmed[..len].to_string(),
        span: start..start + len,
        family: NameFamily::Leading,
    })
}

fn anywhere_name(text: &str) -> Option<NameMatch> {
    let mut offset = 0;
    while offset < text.len() {
        let rest = &text[offset..];
        let Some((skip, _)) = rest.char_indices().find(|(_, c)| is_cjk(*c)) else {
            return None;
        };
        let start = offset + skip;
        let len = leading_cjk_len(&text[start..]);
        let run = &text[start..start + len];
        if is_valid_name(run) {
            return Some(NameMatch {
                name: run.to_string(),
                span: start..start + len,
                family: NameFamily::Anywhere,
            });
        }
        offset = start + len;
    }
    None
}

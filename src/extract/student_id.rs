use std::ops::Range;

use super::patterns::{
    ID_PREFIX, INSTITUTIONAL_ID_LEN, LEGACY_ID_LEN, RX_MAIL_DOMAIN_SUFFIX, RX_MAIL_TAIL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFamily {
    /// 13 digits starting with the institution prefix.
    Institutional,
    /// Bare 8-digit legacy id.
    Legacy,
}

impl IdFamily {
    pub fn describe(&self) -> &'static str {
        match self {
            IdFamily::Institutional => "13-digit",
            IdFamily::Legacy => "8-digit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMatch {
    /// Digits only.
    pub id: String,
    /// Text as it appeared, separators included.
    pub raw: String,
    /// Byte span of `raw` in the scanned text.
    pub span: Range<usize>,
    pub family: IdFamily,
}

/// Scan settings. Free text tolerates any common separator between id
/// fragments; filenames only hyphens.
#[derive(Debug, Clone, Copy)]
pub struct IdScan {
    pub joiners: &'static [char],
    pub max_gap: usize,
    pub exclude_mail_local_parts: bool,
}

pub const TEXT_SCAN: IdScan = IdScan {
    joiners: &['-', '_', ' ', '.'],
    max_gap: 2,
    exclude_mail_local_parts: true,
};

pub const FILENAME_SCAN: IdScan = IdScan {
    joiners: &['-'],
    max_gap: 1,
    exclude_mail_local_parts: true,
};

#[derive(Debug, Clone, Copy)]
struct DigitRun<'t> {
    start: usize,
    end: usize,
    digits: &'t str,
}

fn digit_runs(text: &str) -> Vec<DigitRun<'_>> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        match (c.is_ascii_digit(), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                runs.push(DigitRun {
                    start: s,
                    end: idx,
                    digits: &text[s..idx],
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(DigitRun {
            start: s,
            end: text.len(),
            digits: &text[s..],
        });
    }
    runs
}

/// Digits directly followed by `@domain` or a bare mail domain are a mailbox
/// login, not a student id.
pub fn is_mail_local_part(text: &str, digits_end: usize) -> bool {
    let rest = &text[digits_end..];
    RX_MAIL_TAIL.is_match(rest) || RX_MAIL_DOMAIN_SUFFIX.is_match(rest)
}

/// Find the best student id in `text`.
///
/// Institutional ids beat legacy ids; within a family the earliest mention
/// wins. Runs that were joined into an institutional id are never reused as
/// legacy candidates.
pub fn find_student_id(text: &str, scan: &IdScan) -> Option<IdMatch> {
    let runs = digit_runs(text);
    let mut consumed = vec![false; runs.len()];
    let mut institutional: Vec<IdMatch> = Vec::new();

    for i in 0..runs.len() {
        if consumed[i] || !runs[i].digits.starts_with(ID_PREFIX) {
            continue;
        }
        if runs[i].digits.len() > INSTITUTIONAL_ID_LEN {
            continue;
        }

        let mut combined = runs[i].digits.to_string();
        let mut last = i;
        while combined.len() < INSTITUTIONAL_ID_LEN && last + 1 < runs.len() {
            let next = runs[last + 1];
            let gap = &text[runs[last].end..next.start];
            let joinable = gap.chars().count() <= scan.max_gap
                && gap.chars().all(|c| scan.joiners.contains(&c));
            if !joinable || combined.len() + next.digits.len() > INSTITUTIONAL_ID_LEN {
                break;
            }
            combined.push_str(next.digits);
            last += 1;
        }

        if combined.len() != INSTITUTIONAL_ID_LEN {
            continue;
        }
        let span = runs[i].start..runs[last].end;
        if scan.exclude_mail_local_parts && is_mail_local_part(text, span.end) {
            continue;
        }
        for flag in consumed.iter_mut().take(last + 1).skip(i) {
            *flag = true;
        }
        institutional.push(IdMatch {
            id: combined,
            raw: text[span.clone()].to_string(),
            span,
            family: IdFamily::Institutional,
        });
    }

    if let Some(first) = institutional.into_iter().next() {
        return Some(first);
    }

    runs.iter()
        .zip(consumed.iter())
        .filter(|(run, used)| !**used && run.digits.len() == LEGACY_ID_LEN)
        .find(|(run, _)| !(scan.exclude_mail_local_parts && is_mail_local_part(text, run.end)))
        .map(|(run, _)| IdMatch {
            id: run.digits.to_string(),
            raw: run.digits.to_string(),
            span: run.start..run.end,
            family: IdFamily::Legacy,
        })
}

/// Ways a 13-digit id is commonly typed with hyphens, longest first.
pub fn id_renderings(id: &str) -> Vec<String> {
    let mut renderings = vec![id.to_string()];
    if id.len() == INSTITUTIONAL_ID_LEN && id.starts_with(ID_PREFIX) && id.is_ascii() {
        let suffix = &id[ID_PREFIX.len()..];
        renderings.push(format!("{}-{}", ID_PREFIX, suffix));
        for split in 1..suffix.len() {
            let (a, b) = suffix.split_at(split);
            renderings.push(format!("{}-{}-{}", ID_PREFIX, a, b));
            renderings.push(format!("{}{}-{}", ID_PREFIX, a, b));
        }
    }
    renderings.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    renderings.dedup();
    renderings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_of(text: &str) -> Option<String> {
        find_student_id(text, &TEXT_SCAN).map(|m| m.id)
    }

    #[test]
    fn test_institutional_id() {
        let m = find_student_id("张三 2025123456789 第一次作业", &TEXT_SCAN).unwrap();
        assert_eq!(m.id, "2025123456789");
        assert_eq!(m.family, IdFamily::Institutional);
        assert_eq!(&"张三 2025123456789 第一次作业"[m.span.clone()], "2025123456789");
    }

    #[test]
    fn test_hyphenated_institutional_id() {
        let m = find_student_id("2025-1234-56789张三", &TEXT_SCAN).unwrap();
        assert_eq!(m.id, "2025123456789");
        assert_eq!(m.raw, "2025-1234-56789");
    }

    #[test]
    fn test_mail_local_part_is_not_an_id() {
        assert_eq!(id_of("2025010012345@qq.com 请查收"), None);
        assert_eq!(id_of("2025010012345qq.com"), None);
        assert_eq!(id_of("12345678@163.com"), None);
    }

    #[test]
    fn test_same_id_elsewhere_still_counts() {
        assert_eq!(
            id_of("2025010012345@qq.com 学号2025010012345"),
            Some("2025010012345".to_string())
        );
    }

    #[test]
    fn test_institutional_preferred_over_earlier_legacy() {
        assert_eq!(
            id_of("12345678 then 2025123456789"),
            Some("2025123456789".to_string())
        );
    }

    #[test]
    fn test_earliest_legacy_wins() {
        assert_eq!(id_of("a 87654321 b 12345678"), Some("87654321".to_string()));
    }

    #[test]
    fn test_wrong_lengths_ignored() {
        assert_eq!(id_of("2025121901 作业"), None);
        assert_eq!(id_of("12345678901234567"), None);
    }

    #[test]
    fn test_filename_scan_only_joins_hyphens() {
        assert_eq!(find_student_id("2025 1234 56789", &FILENAME_SCAN), None);
        assert_eq!(
            find_student_id("2025-123456789", &FILENAME_SCAN).map(|m| m.id),
            Some("2025123456789".to_string())
        );
    }

    #[test]
    fn test_id_renderings_contain_three_way_split() {
        let renderings = id_renderings("2025123456789");
        assert!(renderings.contains(&"2025-1234-56789".to_string()));
        assert!(renderings.contains(&"2025-123456789".to_string()));
        assert_eq!(renderings.last().map(String::as_str), Some("2025123456789"));
    }
}

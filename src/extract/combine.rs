use super::candidate::{Candidate, SourceKind};
use super::MAX_CONFIDENCE;
use crate::identity::{Resolution, ResolutionMethod, ResolvedIdentity};

struct FieldWinner<'a> {
    value: &'a str,
    confidence: u8,
    source: SourceKind,
}

/// Strictly highest confidence wins; `candidates` is walked in source
/// priority order so ties keep the earlier source.
fn pick<'a>(
    candidates: &[(SourceKind, &'a Candidate)],
    field: impl Fn(&'a Candidate) -> Option<&'a str>,
) -> Option<FieldWinner<'a>> {
    let mut best: Option<FieldWinner<'a>> = None;
    for (source, candidate) in candidates {
        let Some(value) = field(*candidate).filter(|v| !v.is_empty()) else {
            continue;
        };
        let current = best.as_ref().map_or(0, |b| b.confidence);
        if candidate.confidence > current {
            best = Some(FieldWinner {
                value,
                confidence: candidate.confidence,
                source: *source,
            });
        }
    }
    best
}

/// Merge per-source candidates into one identity.
///
/// Each field is chosen independently. The aggregate confidence is the mean
/// of the three winning confidences, a field without a winner counting as
/// zero.
pub fn combine_candidates(candidates: &[(SourceKind, Candidate)]) -> Resolution {
    let mut ordered: Vec<(SourceKind, &Candidate)> =
        candidates.iter().map(|(source, c)| (*source, c)).collect();
    ordered.sort_by_key(|(source, _)| *source);

    let id = pick(&ordered, |c| c.student_id.as_deref());
    let name = pick(&ordered, |c| c.name.as_deref());
    let assignment = pick(&ordered, |c| c.assignment_fragment.as_deref());

    let total: u16 = [&id, &name, &assignment]
        .into_iter()
        .flatten()
        .map(|w| w.confidence as u16)
        .sum();
    let confidence = (total / 3).min(MAX_CONFIDENCE as u16) as u8;

    let provenance = [("学号", &id), ("姓名", &name), ("作业", &assignment)]
        .into_iter()
        .filter_map(|(field, winner)| {
            winner
                .as_ref()
                .map(|w| format!("{}来自{}", field, w.source.label()))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let trace = ordered
        .iter()
        .flat_map(|(source, c)| {
            c.match_trace
                .iter()
                .map(move |line| format!("{}: {}", source.label(), line))
        })
        .collect();

    let identity = ResolvedIdentity {
        student_id: id.map(|w| w.value.to_string()),
        name: name.map(|w| w.value.to_string()),
        assignment: assignment.map(|w| w.value.to_string()).unwrap_or_default(),
        confidence,
        provenance,
        resolution_method: ResolutionMethod::MetadataParse,
    };
    Resolution { identity, trace }
}

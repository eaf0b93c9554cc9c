pub mod candidate;
pub mod combine;
pub mod fragment;
pub mod name;
pub mod patterns;
pub mod student_id;

pub use candidate::{extract_candidate, Candidate, SourceKind};
pub use combine::combine_candidates;
pub use name::{
    find_name_with, is_valid_name, NameFamily, NameMatch, FILENAME_NAME_FAMILIES,
    FOLDER_NAME_FAMILIES, TEXT_NAME_FAMILIES,
};
pub use student_id::{find_student_id, IdFamily, IdMatch, IdScan, FILENAME_SCAN, TEXT_SCAN};

pub const ID_WEIGHT: u8 = 40;
pub const NAME_WEIGHT: u8 = 35;
pub const ASSIGNMENT_WEIGHT: u8 = 25;
pub const MAX_CONFIDENCE: u8 = 100;

/// Additive confidence of the fields that were found, capped.
pub fn field_confidence(has_id: bool, has_name: bool, has_assignment: bool) -> u8 {
    let mut score: u16 = 0;
    if has_id {
        score += ID_WEIGHT as u16;
    }
    if has_name {
        score += NAME_WEIGHT as u16;
    }
    if has_assignment {
        score += ASSIGNMENT_WEIGHT as u16;
    }
    score.min(MAX_CONFIDENCE as u16) as u8
}

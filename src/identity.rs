//! The resolved identity of one submission, shared by the download pipeline,
//! the sidecar file and the folder resolver.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::extract::field_confidence;

/// Which strategy produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    AttachmentParse,
    /// Also used for identities computed from mail evidence at download time,
    /// since that is what the sidecar later hands back.
    #[default]
    MetadataParse,
    FolderNameParse,
}

impl ResolutionMethod {
    pub const ALL: [ResolutionMethod; 3] = [
        ResolutionMethod::AttachmentParse,
        ResolutionMethod::MetadataParse,
        ResolutionMethod::FolderNameParse,
    ];

    /// Label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionMethod::AttachmentParse => "附件解析",
            ResolutionMethod::MetadataParse => "元数据解析",
            ResolutionMethod::FolderNameParse => "文件夹名解析",
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Best-guess identity of one submission.
///
/// Missing student id and name serialize as empty strings so the sidecar
/// keeps a stable shape; empty strings read back as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    #[serde(default, serialize_with = "empty_if_none", deserialize_with = "none_if_empty")]
    pub student_id: Option<String>,
    #[serde(default, serialize_with = "empty_if_none", deserialize_with = "none_if_empty")]
    pub name: Option<String>,
    #[serde(default)]
    pub assignment: String,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: u8,
    #[serde(default, rename = "source")]
    pub provenance: String,
    #[serde(default, rename = "parsing_method")]
    pub resolution_method: ResolutionMethod,
}

impl ResolvedIdentity {
    /// Identity whose confidence is the additive field weight of what is set.
    pub fn from_fields(
        student_id: Option<String>,
        name: Option<String>,
        assignment: String,
        provenance: impl Into<String>,
        resolution_method: ResolutionMethod,
    ) -> Self {
        let confidence = field_confidence(
            student_id.is_some(),
            name.is_some(),
            !assignment.is_empty(),
        );
        Self {
            student_id,
            name,
            assignment,
            confidence,
            provenance: provenance.into(),
            resolution_method,
        }
    }

    pub fn student_id_str(&self) -> &str {
        self.student_id.as_deref().unwrap_or("")
    }

    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.student_id.is_none() && self.name.is_none() && self.assignment.is_empty()
    }
}

/// An identity plus the human-readable steps that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolution {
    pub identity: ResolvedIdentity,
    pub trace: Vec<String>,
}

fn empty_if_none<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

fn none_if_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Older sidecars store the averaged confidence as a float.
fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(value.clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fields_confidence() {
        let identity = ResolvedIdentity::from_fields(
            Some("2025123456789".into()),
            None,
            "第一次作业".into(),
            "",
            ResolutionMethod::FolderNameParse,
        );
        assert_eq!(identity.confidence, 65);
    }

    #[test]
    fn test_json_shape_and_round_trip() {
        let identity = ResolvedIdentity {
            student_id: None,
            name: Some("张三".into()),
            assignment: "实验报告".into(),
            confidence: 60,
            provenance: "姓名来自标题".into(),
            resolution_method: ResolutionMethod::MetadataParse,
        };
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["student_id"], "");
        assert_eq!(json["source"], "姓名来自标题");
        assert_eq!(json["parsing_method"], "metadata_parse");

        let back: ResolvedIdentity = serde_json::from_value(json).unwrap();
        assert_eq!(back, identity);
    }

    #[test]
    fn test_reads_float_confidence_and_missing_fields() {
        let json = r#"{"student_id": "2025123456789", "name": "", "confidence": 66.66666}"#;
        let identity: ResolvedIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.confidence, 66);
        assert_eq!(identity.name, None);
        assert_eq!(identity.assignment, "");
        assert_eq!(identity.resolution_method, ResolutionMethod::MetadataParse);
    }
}

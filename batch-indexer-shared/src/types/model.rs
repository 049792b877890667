//! Content-model diff types returned by the `modelsdiff` endpoint.

use serde::Deserialize;

/// One entry of the model diff listing. `name` is the model QName in
/// `{uri}localName` form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDiff {
    pub name: String,
    #[serde(default, rename = "type")]
    pub diff_type: String,
    #[serde(default)]
    pub old_checksum: Option<i64>,
    #[serde(default)]
    pub new_checksum: Option<i64>,
}

/// Response of `POST modelsdiff {models: []}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDiffs {
    #[serde(default)]
    pub diffs: Vec<ModelDiff>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_model_diffs() {
        let json = r#"{"diffs": [
            {"name": "{http://www.alfresco.org/model/content/1.0}contentmodel",
             "type": "NEW", "oldChecksum": null, "newChecksum": 123}
        ]}"#;

        let diffs: ModelDiffs = serde_json::from_str(json).unwrap();
        assert_eq!(diffs.diffs.len(), 1);
        assert_eq!(diffs.diffs[0].diff_type, "NEW");
        assert_eq!(diffs.diffs[0].new_checksum, Some(123));
    }
}

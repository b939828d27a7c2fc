//! Request parameter values

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::Result;

/// Parameters of one call, keyed by name
pub type Params = BTreeMap<String, ParamValue>;

/// A single parameter value.
///
/// The request builder resolves each variant explicitly: `Absent` values are
/// dropped, `Sequence` values expand into `key[]` components and `File`
/// values become binary multipart parts.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Absent,
    Scalar(Value),
    Sequence(Vec<Value>),
    File(InputFile),
}

impl ParamValue {
    /// True for `Absent` and for a JSON `null` scalar
    pub fn is_absent(&self) -> bool {
        matches!(self, ParamValue::Absent | ParamValue::Scalar(Value::Null))
    }

    /// JSON form used for JSON bodies; `None` for file values
    pub(crate) fn to_json(&self) -> Option<Value> {
        match self {
            ParamValue::Absent => Some(Value::Null),
            ParamValue::Scalar(v) => Some(v.clone()),
            ParamValue::Sequence(items) => Some(Value::Array(items.clone())),
            ParamValue::File(_) => None,
        }
    }
}

/// Text form of a scalar in query strings and multipart text parts
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ParamValue::Absent,
            Value::Array(items) => ParamValue::Sequence(items),
            other => ParamValue::Scalar(other),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(Value::from(value))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(Value::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Scalar(Value::from(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Scalar(Value::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(Value::from(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Absent)
    }
}

impl From<InputFile> for ParamValue {
    fn from(file: InputFile) -> Self {
        ParamValue::File(file)
    }
}

/// File content sent as a binary multipart part
#[derive(Clone, PartialEq, Eq)]
pub struct InputFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InputFile {
    /// File from in-memory bytes; the MIME type is guessed from the name
    pub fn from_bytes(data: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();
        Self {
            filename,
            mime_type,
            data: data.into(),
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self::from_bytes(data, filename))
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same file metadata over a sub-range of the content
    pub(crate) fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            data: self.data[start..end].to_vec(),
        }
    }
}

impl std::fmt::Debug for InputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputFile")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversions() {
        assert_eq!(ParamValue::from("a"), ParamValue::Scalar(json!("a")));
        assert_eq!(ParamValue::from(3_i64), ParamValue::Scalar(json!(3)));
        assert_eq!(
            ParamValue::from(vec!["x", "y"]),
            ParamValue::Sequence(vec![json!("x"), json!("y")])
        );
        assert_eq!(ParamValue::from(None::<String>), ParamValue::Absent);
        assert_eq!(ParamValue::from(json!(null)), ParamValue::Absent);
        assert_eq!(ParamValue::from(json!([1, 2])), ParamValue::Sequence(vec![json!(1), json!(2)]));
    }

    #[test]
    fn test_null_scalar_is_absent() {
        assert!(ParamValue::Scalar(Value::Null).is_absent());
        assert!(ParamValue::Absent.is_absent());
        assert!(!ParamValue::from(false).is_absent());
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify(&json!("plain")), "plain");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_input_file_guesses_mime() {
        let file = InputFile::from_bytes(vec![1, 2, 3], "avatar.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.len(), 3);

        let unknown = InputFile::from_bytes(Vec::new(), "blob");
        assert_eq!(unknown.mime_type, "application/octet-stream");
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_slice_keeps_metadata() {
        let file = InputFile::from_bytes(b"abcdef".to_vec(), "notes.txt");
        let part = file.slice(2, 4);
        assert_eq!(part.data, b"cd");
        assert_eq!(part.filename, "notes.txt");
        assert_eq!(part.mime_type, file.mime_type);
    }

    #[tokio::test]
    async fn test_from_path_reads_content_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        std::fs::write(&path, b"{}").unwrap();

        let file = InputFile::from_path(&path).await.unwrap();
        assert_eq!(file.filename, "report.json");
        assert_eq!(file.mime_type, "application/json");
        assert_eq!(file.data, b"{}");
    }
}

//! Request builder
//!
//! Turns a method, path, header overrides and parameter map into an
//! [`OutgoingRequest`]. The result is plain data: it is inspected by tests and
//! only converted into a reqwest request at dispatch time.
//!
//! Encoding rules:
//! - `GET`: parameters go to the query string, sequences as repeated `key[]`.
//! - `content-type: multipart/form-data`: a multipart body, files as binary
//!   parts and sequences as repeated `key[]` text parts.
//! - anything else: a JSON object body.
//!
//! Absent parameters are dropped before any of these.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::{
    config::MULTIPART_FORM_DATA,
    error::{ClientError, Result},
    params::{stringify, InputFile, ParamValue, Params},
};

/// Body of an outgoing request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body and no parameters
    None,
    /// Parameters live in the URL query string
    QueryEncoded,
    /// multipart/form-data parts, in encoding order
    Multipart(Vec<FormPart>),
    /// Serialized JSON object
    Json(Vec<u8>),
}

/// One multipart part
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub content: PartContent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartContent {
    Text(String),
    File(InputFile),
}

impl FormPart {
    fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: PartContent::Text(value.into()),
        }
    }

    fn file(name: impl Into<String>, file: InputFile) -> Self {
        Self {
            name: name.into(),
            content: PartContent::File(file),
        }
    }
}

/// A fully built request; one instance per call
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    /// Lowercased header names
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl OutgoingRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decoded query components, in URL order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    /// Convert into a reqwest request bound to `client`
    pub fn into_reqwest(self, client: &reqwest::Client) -> Result<reqwest::Request> {
        let headers = header_map(&self.headers)?;
        let mut builder = client.request(self.method, self.url).headers(headers);

        match self.body {
            RequestBody::None | RequestBody::QueryEncoded => {}
            RequestBody::Json(bytes) => builder = builder.body(bytes),
            RequestBody::Multipart(parts) => builder = builder.multipart(multipart_form(parts)?),
        }

        Ok(builder.build()?)
    }
}

/// Build a request against `endpoint`.
///
/// `default_headers` are the client's configured headers; `overrides` win
/// over them for this call only.
pub fn build_request(
    endpoint: &str,
    default_headers: &BTreeMap<String, String>,
    method: Method,
    path: &str,
    overrides: &BTreeMap<String, String>,
    params: &Params,
) -> Result<OutgoingRequest> {
    let combined = format!("{endpoint}{path}");
    let mut url = Url::parse(&combined)
        .map_err(|e| ClientError::MalformedUrl(format!("{combined}: {e}")))?;

    let mut headers = default_headers.clone();
    for (key, value) in overrides {
        headers.insert(key.to_ascii_lowercase(), value.clone());
    }

    let params: Vec<(&String, &ParamValue)> =
        params.iter().filter(|(_, v)| !v.is_absent()).collect();

    let body = if method == Method::GET {
        encode_query(&mut url, &params)?
    } else if is_multipart(&headers) {
        // reqwest supplies the content-type with the boundary
        headers.remove(CONTENT_TYPE.as_str());
        encode_multipart(&params)
    } else {
        headers.insert(
            CONTENT_TYPE.as_str().to_string(),
            "application/json".to_string(),
        );
        encode_json(&params)?
    };

    Ok(OutgoingRequest {
        method,
        url,
        headers,
        body,
    })
}

fn is_multipart(headers: &BTreeMap<String, String>) -> bool {
    headers
        .get(CONTENT_TYPE.as_str())
        .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(MULTIPART_FORM_DATA))
}

fn encode_query(url: &mut Url, params: &[(&String, &ParamValue)]) -> Result<RequestBody> {
    let mut components = Vec::new();
    for (key, value) in params {
        match value {
            ParamValue::Scalar(v) => components.push((key.to_string(), stringify(v))),
            ParamValue::Sequence(items) => {
                let name = format!("{key}[]");
                components.extend(items.iter().map(|item| (name.clone(), stringify(item))));
            }
            ParamValue::File(_) => {
                return Err(ClientError::Serialization(format!(
                    "file parameter `{key}` cannot be sent in a query string"
                )))
            }
            ParamValue::Absent => {}
        }
    }

    if components.is_empty() {
        return Ok(RequestBody::None);
    }

    url.query_pairs_mut().extend_pairs(components);
    Ok(RequestBody::QueryEncoded)
}

fn encode_multipart(params: &[(&String, &ParamValue)]) -> RequestBody {
    let mut parts = Vec::new();
    for (key, value) in params {
        match value {
            ParamValue::File(file) => parts.push(FormPart::file(key.as_str(), file.clone())),
            ParamValue::Sequence(items) => {
                let name = format!("{key}[]");
                parts.extend(items.iter().map(|item| FormPart::text(&name, stringify(item))));
            }
            ParamValue::Scalar(v) => parts.push(FormPart::text(key.as_str(), stringify(v))),
            ParamValue::Absent => {}
        }
    }
    RequestBody::Multipart(parts)
}

fn encode_json(params: &[(&String, &ParamValue)]) -> Result<RequestBody> {
    let mut object = Map::new();
    for (key, value) in params {
        let json = value.to_json().ok_or_else(|| {
            ClientError::Serialization(format!(
                "file parameter `{key}` requires {MULTIPART_FORM_DATA}"
            ))
        })?;
        object.insert((*key).clone(), json);
    }
    Ok(RequestBody::Json(serde_json::to_vec(&Value::Object(object))?))
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ClientError::InvalidHeader(format!("{key}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidHeader(format!("value for {key}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn multipart_form(parts: Vec<FormPart>) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part.content {
            PartContent::Text(text) => form.text(part.name, text),
            PartContent::File(file) => {
                let bytes = Part::bytes(file.data)
                    .file_name(file.filename)
                    .mime_str(&file.mime_type)
                    .map_err(|e| ClientError::InvalidHeader(format!("mime type: {e}")))?;
                form.part(part.name, bytes)
            }
        };
    }
    Ok(form)
}

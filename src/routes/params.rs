//! Request parameters for the legacy endpoints.
//!
//! The old PHP API accepted the same fields from the query string, a JSON
//! body, a urlencoded form or a multipart form, so every source is folded into
//! one [`RequestInput`]. Lookups never fail: malformed numbers read as absent.

use std::{collections::HashMap, str::FromStr};

use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Multipart, Query, Request},
    http::{HeaderMap, header},
};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde_json::{Map, Value};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Default, Clone)]
pub struct RequestInput {
    fields: Map<String, Value>,
    files: HashMap<String, UploadedFile>,
    bearer: Option<String>,
}

impl RequestInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an input from a JSON object; other JSON values give an empty input.
    pub fn from_json(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn with_file(mut self, key: &str, file: UploadedFile) -> Self {
        self.files.insert(key.to_string(), file);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|v| !v.is_null())
    }

    /// Field as text, as sent (trimmed); present-but-empty yields `Some("")`.
    pub fn raw_text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Non-empty trimmed text.
    pub fn text(&self, key: &str) -> Option<String> {
        self.raw_text(key).filter(|s| !s.is_empty())
    }

    pub fn text_or_default(&self, key: &str) -> String {
        self.raw_text(key).unwrap_or_default()
    }

    pub fn i64(&self, key: &str) -> Option<i64> {
        self.raw_text(key).as_deref().and_then(parse_int)
    }

    pub fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.i64(key).unwrap_or(default)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.raw_text(key)
            .and_then(|s| s.replace(',', ".").parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    pub fn decimal(&self, key: &str) -> Option<Decimal> {
        self.raw_text(key).as_deref().and_then(parse_decimal)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.opt_flag(key).unwrap_or(false)
    }

    pub fn opt_flag(&self, key: &str) -> Option<bool> {
        self.raw_text(key).map(|s| parse_flag(&s))
    }

    /// Structured field; JSON encoded strings (from forms) are decoded.
    pub fn json(&self, key: &str) -> Option<Value> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) => serde_json::from_str(s).ok(),
            other => Some(other.clone()),
        }
    }

    pub fn file(&self, key: &str) -> Option<&UploadedFile> {
        self.files.get(key)
    }

    /// Bearer token from the `Authorization` header, else a `token` field.
    pub fn bearer(&self) -> Option<String> {
        self.bearer.clone().or_else(|| self.text("token"))
    }
}

pub fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// Lenient money parsing: accepts `9.90`, `9,90`, `CHF 9.90`, `1'290.00`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("CHF")
        .trim_start_matches("Fr.")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().and_then(Decimal::from_f64))
}

pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl<S> FromRequest<S> for RequestInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut input = RequestInput::new();
        if let Ok(Query(query)) = Query::<HashMap<String, String>>::try_from_uri(req.uri()) {
            for (key, value) in query {
                input.fields.insert(key, Value::String(value));
            }
        }
        input.bearer = bearer_token(req.headers());

        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|err| AppError::BadRequest(err.body_text()))?;
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|err| AppError::BadRequest(err.body_text()))?
            {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                match field.file_name().map(str::to_string) {
                    Some(file_name) => {
                        let content_type = field.content_type().map(str::to_string);
                        let bytes = field
                            .bytes()
                            .await
                            .map_err(|err| AppError::BadRequest(err.body_text()))?;
                        // Browsers submit an empty part for file inputs left blank.
                        if file_name.is_empty() || bytes.is_empty() {
                            continue;
                        }
                        input.files.insert(
                            name,
                            UploadedFile {
                                file_name,
                                content_type,
                                bytes,
                            },
                        );
                    }
                    None => {
                        let text = field
                            .text()
                            .await
                            .map_err(|err| AppError::BadRequest(err.body_text()))?;
                        input.fields.insert(name, Value::String(text));
                    }
                }
            }
        } else if content_type.starts_with("application/json") {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(|err| AppError::BadRequest(err.body_text()))?;
            if !bytes.is_empty() {
                match serde_json::from_slice::<Value>(&bytes) {
                    Ok(Value::Object(map)) => input.fields.extend(map),
                    Ok(_) => {
                        return Err(AppError::BadRequest("JSON body must be an object".into()));
                    }
                    Err(_) => return Err(AppError::BadRequest("Invalid JSON body".into())),
                }
            }
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|err| AppError::BadRequest(err.body_text()))?;
            for (key, value) in form {
                input.fields.insert(key, Value::String(value));
            }
        }

        Ok(input)
    }
}

/// `page`/`limit` paging for order listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 50;

    pub fn from_input(input: &RequestInput) -> Self {
        Self {
            page: input.i64("page"),
            limit: input.i64("limit").or_else(|| input.i64("per_page")),
        }
    }

    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT);
        let offset = (page - 1) * limit;
        (page, limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_degrade_to_none() {
        let input = RequestInput::from_json(json!({
            "stock": "abc",
            "qty": "7",
            "float_int": "3.0",
            "n": 12,
        }));
        assert_eq!(input.i64("stock"), None);
        assert_eq!(input.i64_or("stock", 0), 0);
        assert_eq!(input.i64("qty"), Some(7));
        assert_eq!(input.i64("float_int"), Some(3));
        assert_eq!(input.i64("n"), Some(12));
        assert_eq!(input.i64("missing"), None);
    }

    #[test]
    fn decimals_accept_swiss_formats() {
        assert_eq!(parse_decimal("9.90"), Some(Decimal::new(990, 2)));
        assert_eq!(parse_decimal("9,90"), Some(Decimal::new(990, 2)));
        assert_eq!(parse_decimal("CHF 12.50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_decimal("1'290.00"), Some(Decimal::new(129000, 2)));
        assert_eq!(parse_decimal("gratis"), None);
    }

    #[test]
    fn flags() {
        let input = RequestInput::from_json(json!({"a": "1", "b": true, "c": "no", "d": "on"}));
        assert!(input.flag("a"));
        assert!(input.flag("b"));
        assert!(!input.flag("c"));
        assert!(input.flag("d"));
        assert!(!input.flag("e"));
    }

    #[test]
    fn json_strings_are_decoded() {
        let input = RequestInput::new().with_field("items", r#"[{"id":1}]"#);
        assert_eq!(input.json("items"), Some(json!([{"id": 1}])));
    }

    #[test]
    fn pagination_bounds() {
        let p = Pagination { page: Some(0), limit: Some(500) };
        assert_eq!(p.normalize(), (1, 50, 0));
        let p = Pagination { page: Some(3), limit: None };
        assert_eq!(p.normalize(), (3, 20, 40));
    }
}

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AppError, FieldError};

/// JSON body that has passed its `Validate` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<Value>::from_request(req, state).await?;
        let value: T = serde_path_to_error::deserialize(raw)
            .map_err(|e| AppError::Validation(vec![type_error(&e.path().to_string())]))?;
        value
            .validate()
            .map_err(|e| AppError::Validation(field_errors(&e)))?;
        Ok(ValidatedJson(value))
    }
}

/// Flattens validator output into one entry per violation.
///
/// Struct-level checks land under `__all__`; their error code names the
/// offending field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let param = if field == "__all__" {
                    e.code.to_string()
                } else {
                    field.to_string()
                };
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", param));
                FieldError { param, msg }
            })
        })
        .collect();
    out.sort_by(|a, b| a.param.cmp(&b.param).then_with(|| a.msg.cmp(&b.msg)));
    out
}

// Well-formed JSON whose field has the wrong shape, e.g. an array for a string.
fn type_error(path: &str) -> FieldError {
    let param = match path {
        "" | "." => "body",
        p => p,
    };
    FieldError::new(param, format!("{} is invalid", param))
}

/// Trims surrounding whitespace before any length rule sees the value.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

pub fn rule_error(field: &'static str, msg: &'static str) -> ValidationError {
    let mut err = ValidationError::new(field);
    err.message = Some(msg.into());
    err
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// Shared `from`/`to` rule for experience and education entries.
pub fn check_date_range(from: Option<&str>, to: Option<&str>) -> Result<(), ValidationError> {
    let Some(from) = from.filter(|f| !f.trim().is_empty()) else {
        // absence is reported by the field-level `required` rule
        return Ok(());
    };
    let from = parse_date(from).ok_or_else(|| rule_error("from", "From date is not a valid date"))?;
    match to.filter(|t| !t.trim().is_empty()) {
        None => Ok(()),
        Some(to) => {
            let to = parse_date(to).ok_or_else(|| rule_error("to", "To date is not a valid date"))?;
            if from < to {
                Ok(())
            } else {
                Err(rule_error(
                    "from",
                    "From date is required and needs to be from the past",
                ))
            }
        }
    }
}

use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    error::{AppError, FieldError},
    profiles::model::{Education, Experience},
    validation::{check_date_range, parse_date, rule_error},
};

/// Body of `POST /api/profile`. Empty strings count as "not supplied".
#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "skills_have_entries", skip_on_field_errors = false))]
pub struct ProfileInput {
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    #[validate(
        required(message = "Status is required"),
        length(min = 1, message = "Status is required")
    )]
    pub status: Option<String>,
    pub githubusername: Option<String>,
    /// Comma-separated, e.g. `"html, css, js"`.
    #[validate(
        required(message = "Skills is required"),
        length(min = 1, message = "Skills is required")
    )]
    pub skills: Option<String>,
    pub youtube: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub instagram: Option<String>,
    pub linkedin: Option<String>,
}

fn skills_have_entries(input: &ProfileInput) -> Result<(), ValidationError> {
    match input.skills.as_deref() {
        Some(raw) if !raw.is_empty() && split_skills(raw).is_empty() => {
            Err(rule_error("skills", "Skills is required"))
        }
        _ => Ok(()),
    }
}

/// Comma-split, trimmed, blanks dropped, order kept.
pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Body of `PUT /api/profile/experience`.
#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "experience_dates", skip_on_field_errors = false))]
pub struct ExperienceInput {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, message = "Title is required")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Company is required"),
        length(min = 1, message = "Company is required")
    )]
    pub company: Option<String>,
    pub location: Option<String>,
    #[validate(
        required(message = "From date is required and needs to be from the past"),
        length(min = 1, message = "From date is required and needs to be from the past")
    )]
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

fn experience_dates(input: &ExperienceInput) -> Result<(), ValidationError> {
    check_date_range(input.from.as_deref(), input.to.as_deref())
}

impl ExperienceInput {
    /// Builds the stored entry under a fresh id.
    pub fn into_entry(self) -> Result<Experience, AppError> {
        let (from, to) = entry_dates(self.from.as_deref(), self.to.as_deref())?;
        Ok(Experience {
            id: Uuid::new_v4(),
            title: required(self.title, "title", "Title is required")?,
            company: required(self.company, "company", "Company is required")?,
            location: supplied(self.location),
            from,
            to,
            current: self.current,
            description: supplied(self.description),
        })
    }
}

/// Body of `PUT /api/profile/education`.
#[derive(Debug, Default, Deserialize, Validate)]
#[validate(schema(function = "education_dates", skip_on_field_errors = false))]
pub struct EducationInput {
    #[validate(
        required(message = "School is required"),
        length(min = 1, message = "School is required")
    )]
    pub school: Option<String>,
    #[validate(
        required(message = "Degree is required"),
        length(min = 1, message = "Degree is required")
    )]
    pub degree: Option<String>,
    #[validate(
        required(message = "Field of study is required"),
        length(min = 1, message = "Field of study is required")
    )]
    pub fieldofstudy: Option<String>,
    #[validate(
        required(message = "From date is required and needs to be from the past"),
        length(min = 1, message = "From date is required and needs to be from the past")
    )]
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub current: bool,
    pub description: Option<String>,
}

fn education_dates(input: &EducationInput) -> Result<(), ValidationError> {
    check_date_range(input.from.as_deref(), input.to.as_deref())
}

impl EducationInput {
    pub fn into_entry(self) -> Result<Education, AppError> {
        let (from, to) = entry_dates(self.from.as_deref(), self.to.as_deref())?;
        Ok(Education {
            id: Uuid::new_v4(),
            school: required(self.school, "school", "School is required")?,
            degree: required(self.degree, "degree", "Degree is required")?,
            fieldofstudy: required(
                self.fieldofstudy,
                "fieldofstudy",
                "Field of study is required",
            )?,
            from,
            to,
            current: self.current,
            description: supplied(self.description),
        })
    }
}

/// `Some` only for non-empty values.
pub fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(value: Option<String>, param: &str, msg: &str) -> Result<String, AppError> {
    supplied(value).ok_or_else(|| AppError::Validation(vec![FieldError::new(param, msg)]))
}

type DateRange = (time::OffsetDateTime, Option<time::OffsetDateTime>);

fn entry_dates(from: Option<&str>, to: Option<&str>) -> Result<DateRange, AppError> {
    let invalid = |param: &str, msg: &str| AppError::Validation(vec![FieldError::new(param, msg)]);
    let from = from.and_then(parse_date).ok_or_else(|| {
        invalid("from", "From date is required and needs to be from the past")
    })?;
    let to = match to.filter(|t| !t.trim().is_empty()) {
        None => None,
        Some(raw) => Some(parse_date(raw).ok_or_else(|| invalid("to", "To date is not a valid date"))?),
    };
    Ok((from, to))
}

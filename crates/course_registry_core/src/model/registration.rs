//! Course registration domain model.
//!
//! # Responsibility
//! - Define the registration read model and its write payloads.
//! - Map typed payloads onto flat document fields per schema profile.
//!
//! # Invariants
//! - `id` is assigned by the store and never supplied by callers.
//! - `registrationDate` is written only at creation; patches cannot name it.
//! - A payload may only carry the optional fields of its schema profile.

use crate::model::value::{DocumentId, Timestamp, WriteDocument, WriteValue};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned registration identifier.
pub type RegistrationId = DocumentId;

/// Document field names as persisted in the collection.
pub mod fields {
    pub const COURSE_NAME: &str = "courseName";
    pub const NAME: &str = "name";
    pub const PHONE: &str = "phone";
    pub const EMAIL: &str = "email";
    pub const AGE: &str = "age";
    pub const ADDRESS: &str = "address";
    pub const GENDER: &str = "gender";
    pub const PAYMENT_STATUS: &str = "payment_status";
    pub const PRIVACY_AGREED: &str = "privacy_agreed";
    pub const PURPOSE: &str = "purpose";
    pub const REGION: &str = "region";
    pub const REGISTRATION_DATE: &str = "registrationDate";
    pub const LAST_UPDATED: &str = "lastUpdated";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// Default collection holding registration documents.
pub const DEFAULT_COLLECTION: &str = "registrations";

/// Which optional field set a registration form submits.
///
/// Two form variants exist in the field: the enrollment form collects
/// personal and payment details, the inquiry form collects purpose/region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaProfile {
    /// age/address/gender/payment_status/privacy_agreed; writes `lastUpdated`.
    #[default]
    Enrollment,
    /// purpose/region; creation writes `registrationDate` only.
    Inquiry,
}

impl SchemaProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enrollment => "enrollment",
            Self::Inquiry => "inquiry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enrollment" => Some(Self::Enrollment),
            "inquiry" => Some(Self::Inquiry),
            _ => None,
        }
    }

    /// Whether creation and updates maintain the `lastUpdated` field.
    pub fn tracks_last_updated(self) -> bool {
        matches!(self, Self::Enrollment)
    }

    fn allows(self, field: &'static str) -> bool {
        match self {
            Self::Enrollment => matches!(
                field,
                fields::AGE
                    | fields::ADDRESS
                    | fields::GENDER
                    | fields::PAYMENT_STATUS
                    | fields::PRIVACY_AGREED
            ),
            Self::Inquiry => matches!(field, fields::PURPOSE | fields::REGION),
        }
    }
}

impl Display for SchemaProfile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for registration payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationValidationError {
    /// A required contact field is empty or whitespace.
    BlankRequiredField(&'static str),
    /// An optional field belongs to the other schema profile.
    FieldNotInProfile {
        field: &'static str,
        profile: SchemaProfile,
    },
}

impl Display for RegistrationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankRequiredField(field) => write!(f, "required field `{field}` is blank"),
            Self::FieldNotInProfile { field, profile } => {
                write!(f, "field `{field}` is not part of the `{profile}` profile")
            }
        }
    }
}

impl Error for RegistrationValidationError {}

/// Persisted registration as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: RegistrationId,
    pub course_name: String,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(rename = "payment_status", skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(rename = "privacy_agreed", skip_serializing_if = "Option::is_none")]
    pub privacy_agreed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Server-assigned at creation; absent only for foreign documents.
    pub registration_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Registration {
    /// Whole seconds of the creation timestamp, `0` when missing.
    pub fn registration_seconds(&self) -> i64 {
        self.registration_date.map_or(0, |ts| ts.seconds)
    }
}

/// Form submission for a new registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRegistration {
    pub course_name: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub payment_status: Option<String>,
    pub privacy_agreed: Option<bool>,
    pub purpose: Option<String>,
    pub region: Option<String>,
}

impl NewRegistration {
    pub fn new(
        course_name: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            course_name: course_name.into(),
            name: name.into(),
            phone: phone.into(),
            ..Self::default()
        }
    }

    /// Builds the creation write set without timestamp sentinels.
    ///
    /// Only fields that are present are written; absent optional fields do
    /// not appear in the stored document.
    pub fn to_write_document(
        &self,
        profile: SchemaProfile,
    ) -> Result<WriteDocument, RegistrationValidationError> {
        let mut doc = WriteDocument::new();
        put_required(&mut doc, fields::COURSE_NAME, &self.course_name)?;
        put_required(&mut doc, fields::NAME, &self.name)?;
        put_required(&mut doc, fields::PHONE, &self.phone)?;
        if let Some(email) = &self.email {
            doc.insert(fields::EMAIL.to_string(), WriteValue::from(email.as_str()));
        }
        put_optional_fields(
            &mut doc,
            profile,
            OptionalFields {
                age: self.age,
                address: self.address.as_deref(),
                gender: self.gender.as_deref(),
                payment_status: self.payment_status.as_deref(),
                privacy_agreed: self.privacy_agreed,
                purpose: self.purpose.as_deref(),
                region: self.region.as_deref(),
            },
        )?;
        Ok(doc)
    }
}

/// Partial update; `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationPatch {
    pub course_name: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub address: Option<String>,
    pub gender: Option<String>,
    pub payment_status: Option<String>,
    pub privacy_agreed: Option<bool>,
    pub purpose: Option<String>,
    pub region: Option<String>,
}

impl RegistrationPatch {
    /// Builds the merge write set for the named fields only.
    pub fn to_write_document(
        &self,
        profile: SchemaProfile,
    ) -> Result<WriteDocument, RegistrationValidationError> {
        let mut doc = WriteDocument::new();
        if let Some(course_name) = &self.course_name {
            put_required(&mut doc, fields::COURSE_NAME, course_name)?;
        }
        if let Some(name) = &self.name {
            put_required(&mut doc, fields::NAME, name)?;
        }
        if let Some(phone) = &self.phone {
            put_required(&mut doc, fields::PHONE, phone)?;
        }
        if let Some(email) = &self.email {
            doc.insert(fields::EMAIL.to_string(), WriteValue::from(email.as_str()));
        }
        put_optional_fields(
            &mut doc,
            profile,
            OptionalFields {
                age: self.age,
                address: self.address.as_deref(),
                gender: self.gender.as_deref(),
                payment_status: self.payment_status.as_deref(),
                privacy_agreed: self.privacy_agreed,
                purpose: self.purpose.as_deref(),
                region: self.region.as_deref(),
            },
        )?;
        Ok(doc)
    }
}

struct OptionalFields<'a> {
    age: Option<i64>,
    address: Option<&'a str>,
    gender: Option<&'a str>,
    payment_status: Option<&'a str>,
    privacy_agreed: Option<bool>,
    purpose: Option<&'a str>,
    region: Option<&'a str>,
}

fn put_required(
    doc: &mut WriteDocument,
    field: &'static str,
    value: &str,
) -> Result<(), RegistrationValidationError> {
    if value.trim().is_empty() {
        return Err(RegistrationValidationError::BlankRequiredField(field));
    }
    doc.insert(field.to_string(), WriteValue::from(value));
    Ok(())
}

fn put_optional_fields(
    doc: &mut WriteDocument,
    profile: SchemaProfile,
    values: OptionalFields<'_>,
) -> Result<(), RegistrationValidationError> {
    let entries: [(&'static str, Option<WriteValue>); 7] = [
        (fields::AGE, values.age.map(WriteValue::from)),
        (fields::ADDRESS, values.address.map(WriteValue::from)),
        (fields::GENDER, values.gender.map(WriteValue::from)),
        (fields::PAYMENT_STATUS, values.payment_status.map(WriteValue::from)),
        (fields::PRIVACY_AGREED, values.privacy_agreed.map(WriteValue::from)),
        (fields::PURPOSE, values.purpose.map(WriteValue::from)),
        (fields::REGION, values.region.map(WriteValue::from)),
    ];

    for (field, value) in entries {
        let Some(value) = value else {
            continue;
        };
        if !profile.allows(field) {
            return Err(RegistrationValidationError::FieldNotInProfile { field, profile });
        }
        doc.insert(field.to_string(), value);
    }
    Ok(())
}

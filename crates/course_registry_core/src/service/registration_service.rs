//! Course registration use-case service.
//!
//! # Responsibility
//! - Provide create/list/get/update/delete entry points over one collection.
//! - Map flat store documents into `Registration` read models.
//! - Emit one diagnostic log line per failed operation, then return the
//!   error unchanged.
//!
//! # Invariants
//! - The store is injected at construction; no ambient connection.
//! - `list_by_course` queries with an equality filter only and sorts newest
//!   first in memory by whole seconds, missing timestamps counting as 0.
//! - Log lines carry ids and codes only, never contact data.

use crate::model::registration::{
    fields, NewRegistration, Registration, RegistrationId, RegistrationPatch, SchemaProfile,
    DEFAULT_COLLECTION,
};
use crate::model::value::{Document, FieldValue, Timestamp, WriteValue};
use crate::store::{DocumentStore, SortDirection, StoreError, StoreResult, StoredDocument};
use log::{debug, error, info};
use std::time::Instant;

/// Registration CRUD facade over an injected document store.
pub struct RegistrationStore<S: DocumentStore> {
    store: S,
    collection: String,
    profile: SchemaProfile,
}

impl<S: DocumentStore> RegistrationStore<S> {
    /// Uses the default `registrations` collection.
    pub fn new(store: S, profile: SchemaProfile) -> Self {
        Self::with_collection(store, DEFAULT_COLLECTION, profile)
    }

    pub fn with_collection(
        store: S,
        collection: impl Into<String>,
        profile: SchemaProfile,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            profile,
        }
    }

    pub fn profile(&self) -> SchemaProfile {
        self.profile
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Persists a new registration and returns it as stored.
    ///
    /// # Contract
    /// - Writes `registrationDate` as a server timestamp.
    /// - Enrollment profile also writes `lastUpdated` with the same reading.
    /// - Returns the read-back record including the store-assigned id.
    pub fn create(&self, input: &NewRegistration) -> StoreResult<Registration> {
        let started_at = Instant::now();
        let result = self.create_inner(input);
        match &result {
            Ok(registration) => info!(
                "event=registration_create module=service status=ok collection={} profile={} id={} duration_ms={}",
                self.collection,
                self.profile,
                registration.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => self.log_failure("registration_create", None, started_at, err),
        }
        result
    }

    fn create_inner(&self, input: &NewRegistration) -> StoreResult<Registration> {
        let mut doc = input.to_write_document(self.profile)?;
        doc.insert(
            fields::REGISTRATION_DATE.to_string(),
            WriteValue::ServerTimestamp,
        );
        if self.profile.tracks_last_updated() {
            doc.insert(fields::LAST_UPDATED.to_string(), WriteValue::ServerTimestamp);
        }

        let id = self.store.add(&self.collection, &doc)?;
        let stored = self
            .store
            .get(&self.collection, &id)?
            .ok_or(StoreError::InconsistentState(
                "created registration not found in read-back",
            ))?;
        parse_registration(id, &stored)
    }

    /// Lists every registration, newest first, using the store's ordering.
    pub fn list_all(&self) -> StoreResult<Vec<Registration>> {
        let started_at = Instant::now();
        let result = self
            .store
            .query_ordered(
                &self.collection,
                fields::REGISTRATION_DATE,
                SortDirection::Descending,
            )
            .and_then(parse_all);
        match &result {
            Ok(items) => debug!(
                "event=registration_list module=service status=ok collection={} count={} duration_ms={}",
                self.collection,
                items.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => self.log_failure("registration_list", None, started_at, err),
        }
        result
    }

    /// Lists registrations whose `courseName` equals `course_name` exactly.
    ///
    /// Only the equality filter is pushed to the store; ordering happens
    /// here so the store never needs a combined filter+sort index.
    pub fn list_by_course(&self, course_name: &str) -> StoreResult<Vec<Registration>> {
        let started_at = Instant::now();
        let result = self
            .store
            .query_eq(
                &self.collection,
                fields::COURSE_NAME,
                &FieldValue::from(course_name),
            )
            .and_then(parse_all)
            .map(|mut items| {
                sort_newest_first(&mut items);
                items
            });
        match &result {
            Ok(items) => debug!(
                "event=registration_list_by_course module=service status=ok collection={} count={} duration_ms={}",
                self.collection,
                items.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => self.log_failure("registration_list_by_course", None, started_at, err),
        }
        result
    }

    /// Fetches one registration by id.
    pub fn get(&self, id: &str) -> StoreResult<Option<Registration>> {
        let started_at = Instant::now();
        let result = self
            .store
            .get(&self.collection, id)
            .and_then(|doc| doc.map(|doc| parse_registration(id.to_string(), &doc)).transpose());
        if let Err(err) = &result {
            self.log_failure("registration_get", Some(id), started_at, err);
        }
        result
    }

    /// Merges the named patch fields into an existing registration.
    ///
    /// # Contract
    /// - Fields not named in `patch` are untouched.
    /// - Always refreshes `updatedAt`; Enrollment also refreshes `lastUpdated`.
    /// - Missing id fails with `StoreError::NotFound`.
    pub fn update(&self, id: &str, patch: &RegistrationPatch) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = patch
            .to_write_document(self.profile)
            .map_err(StoreError::from)
            .and_then(|mut doc| {
                doc.insert(fields::UPDATED_AT.to_string(), WriteValue::ServerTimestamp);
                if self.profile.tracks_last_updated() {
                    doc.insert(fields::LAST_UPDATED.to_string(), WriteValue::ServerTimestamp);
                }
                self.store.update(&self.collection, id, &doc)
            });
        match &result {
            Ok(()) => info!(
                "event=registration_update module=service status=ok collection={} id={} duration_ms={}",
                self.collection,
                id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => self.log_failure("registration_update", Some(id), started_at, err),
        }
        result
    }

    /// Permanently removes a registration.
    ///
    /// Deleting an id that does not exist succeeds without effect.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let started_at = Instant::now();
        match self.store.delete(&self.collection, id) {
            Ok(removed) => {
                if removed {
                    info!(
                        "event=registration_delete module=service status=ok collection={} id={} duration_ms={}",
                        self.collection,
                        id,
                        started_at.elapsed().as_millis()
                    );
                } else {
                    debug!(
                        "event=registration_delete module=service status=noop collection={} id={}",
                        self.collection, id
                    );
                }
                Ok(())
            }
            Err(err) => {
                self.log_failure("registration_delete", Some(id), started_at, &err);
                Err(err)
            }
        }
    }

    fn log_failure(&self, event: &str, id: Option<&str>, started_at: Instant, err: &StoreError) {
        error!(
            "event={} module=service status=error collection={} id={} duration_ms={} error_code={} error={}",
            event,
            self.collection,
            id.unwrap_or("-"),
            started_at.elapsed().as_millis(),
            err.code(),
            err
        );
    }
}

/// Stable sort, newest first by whole seconds; missing timestamps sort as 0.
pub fn sort_newest_first(items: &mut [Registration]) {
    items.sort_by(|left, right| {
        right
            .registration_seconds()
            .cmp(&left.registration_seconds())
    });
}

fn parse_all(docs: Vec<StoredDocument>) -> StoreResult<Vec<Registration>> {
    docs.into_iter()
        .map(|doc| parse_registration(doc.id, &doc.fields))
        .collect()
}

fn parse_registration(id: RegistrationId, doc: &Document) -> StoreResult<Registration> {
    Ok(Registration {
        course_name: required_string(&id, doc, fields::COURSE_NAME)?,
        name: required_string(&id, doc, fields::NAME)?,
        phone: required_string(&id, doc, fields::PHONE)?,
        email: optional_string(&id, doc, fields::EMAIL)?,
        age: optional_integer(&id, doc, fields::AGE)?,
        address: optional_string(&id, doc, fields::ADDRESS)?,
        gender: optional_string(&id, doc, fields::GENDER)?,
        payment_status: optional_string(&id, doc, fields::PAYMENT_STATUS)?,
        privacy_agreed: optional_bool(&id, doc, fields::PRIVACY_AGREED)?,
        purpose: optional_string(&id, doc, fields::PURPOSE)?,
        region: optional_string(&id, doc, fields::REGION)?,
        registration_date: optional_timestamp(&id, doc, fields::REGISTRATION_DATE)?,
        last_updated: optional_timestamp(&id, doc, fields::LAST_UPDATED)?,
        updated_at: optional_timestamp(&id, doc, fields::UPDATED_AT)?,
        id,
    })
}

fn invalid(id: &str, field: &str, expected: &str) -> StoreError {
    StoreError::InvalidData(format!(
        "registration `{id}` field `{field}` is not {expected}"
    ))
}

fn required_string(id: &str, doc: &Document, field: &str) -> StoreResult<String> {
    optional_string(id, doc, field)?.ok_or_else(|| invalid(id, field, "a present string"))
}

fn optional_string(id: &str, doc: &Document, field: &str) -> StoreResult<Option<String>> {
    match doc.get(field) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(invalid(id, field, "a string")),
    }
}

fn optional_integer(id: &str, doc: &Document, field: &str) -> StoreResult<Option<i64>> {
    match doc.get(field) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::Integer(value)) => Ok(Some(*value)),
        Some(_) => Err(invalid(id, field, "an integer")),
    }
}

fn optional_bool(id: &str, doc: &Document, field: &str) -> StoreResult<Option<bool>> {
    match doc.get(field) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(invalid(id, field, "a boolean")),
    }
}

fn optional_timestamp(id: &str, doc: &Document, field: &str) -> StoreResult<Option<Timestamp>> {
    match doc.get(field) {
        None | Some(FieldValue::Null) => Ok(None),
        Some(FieldValue::Timestamp(value)) => Ok(Some(*value)),
        Some(_) => Err(invalid(id, field, "a timestamp")),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_registration, sort_newest_first};
    use crate::model::registration::fields;
    use crate::model::value::{Document, FieldValue, Timestamp};
    use crate::store::StoreError;

    fn doc_at(seconds: Option<i64>, nanos: u32) -> Document {
        let mut doc = Document::new();
        doc.insert(fields::COURSE_NAME.to_string(), "Yoga".into());
        doc.insert(fields::NAME.to_string(), "Kim".into());
        doc.insert(fields::PHONE.to_string(), "010".into());
        if let Some(seconds) = seconds {
            doc.insert(
                fields::REGISTRATION_DATE.to_string(),
                Timestamp::new(seconds, nanos).into(),
            );
        }
        doc
    }

    #[test]
    fn sort_uses_whole_seconds_and_keeps_ties_stable() {
        let mut items = vec![
            parse_registration("a".to_string(), &doc_at(Some(10), 1)).unwrap(),
            parse_registration("b".to_string(), &doc_at(None, 0)).unwrap(),
            parse_registration("c".to_string(), &doc_at(Some(10), 900)).unwrap(),
            parse_registration("d".to_string(), &doc_at(Some(20), 0)).unwrap(),
        ];
        sort_newest_first(&mut items);

        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn parse_rejects_missing_required_field() {
        let mut doc = doc_at(Some(1), 0);
        doc.remove(fields::PHONE);
        let err = parse_registration("x".to_string(), &doc).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(message) if message.contains("phone")));
    }

    #[test]
    fn parse_treats_null_optional_fields_as_absent() {
        let mut doc = doc_at(Some(1), 0);
        doc.insert(fields::EMAIL.to_string(), FieldValue::Null);
        let parsed = parse_registration("x".to_string(), &doc).unwrap();
        assert_eq!(parsed.email, None);
        assert_eq!(parsed.registration_seconds(), 1);
    }
}

// Resource accessor template
//
// Every managed resource follows the same life cycle: find the record's
// current position in the remote list, post the form that acts on it, then
// read the list again to see what the console actually did. The steps live
// here once; each resource supplies an `Endpoint` describing its pages,
// form fields and decoding.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::client::Client;
use crate::coordinator::LockCategory;
use crate::error::{Error, Operation};
use crate::form::{Form, Page};

/// A record identified by a caller-chosen natural key.
pub trait ManagedResource {
    /// The key callers look the record up by, for example an alias name.
    fn natural_key(&self) -> String;
}

/// A decoded record together with its offset in the remote list.
///
/// The offset is only valid while the category lock that read it is held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Indexed<T> {
    pub index: usize,
    pub record: T,
}

/// How one resource type maps onto the console.
pub(crate) trait Endpoint: Sync {
    type Record: ManagedResource + Send + Sync;

    /// Display name used in errors and logs.
    const RESOURCE: &'static str;
    const CATEGORY: LockCategory;

    fn config_path(&self) -> String;

    /// Decode the config subtree, keeping each record's unfiltered offset.
    fn decode(&self, raw: Value) -> Result<Vec<Indexed<Self::Record>>, Error>;

    fn key_matches(&self, record: &Self::Record, key: &str) -> bool {
        record.natural_key() == key
    }

    /// Reject records that cannot be encoded, before any request is sent.
    fn validate(&self, record: &Self::Record) -> Result<(), Error>;

    fn save_page(&self) -> Page;
    fn save_form(&self, record: &Self::Record) -> Form;
    fn delete_page(&self) -> Page;
    fn delete_form(&self) -> Form;
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    LocatingIndex,
    Submitting,
    Verifying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LocatingIndex => "locating_index",
            Self::Submitting => "submitting",
            Self::Verifying => "verifying",
        })
    }
}

fn locate<E: Endpoint>(
    endpoint: &E,
    records: Vec<Indexed<E::Record>>,
    key: &str,
) -> Option<Indexed<E::Record>> {
    records
        .into_iter()
        .find(|item| endpoint.key_matches(&item.record, key))
}

fn not_found<E: Endpoint>(key: &str) -> Error {
    Error::NotFound {
        resource: E::RESOURCE,
        key: key.to_owned(),
    }
}

impl Client {
    pub(crate) async fn list_records<E: Endpoint>(
        &self,
        endpoint: &E,
    ) -> Result<Vec<E::Record>, Error> {
        let result = async {
            let _guard = self.read_lock(E::CATEGORY).await?;
            self.fetch(endpoint).await
        }
        .await;

        result
            .map(|records| records.into_iter().map(|item| item.record).collect())
            .map_err(|e| Error::operation(Operation::Get, E::RESOURCE, e))
    }

    pub(crate) async fn get_record<E: Endpoint>(
        &self,
        endpoint: &E,
        key: &str,
    ) -> Result<E::Record, Error> {
        let result = async {
            let _guard = self.read_lock(E::CATEGORY).await?;
            let records = self.fetch(endpoint).await?;
            locate(endpoint, records, key).ok_or_else(|| not_found::<E>(key))
        }
        .await;

        result
            .map(|item| item.record)
            .map_err(|e| Error::operation(Operation::Get, E::RESOURCE, e))
    }

    pub(crate) async fn create_record<E: Endpoint>(
        &self,
        endpoint: &E,
        record: &E::Record,
    ) -> Result<E::Record, Error> {
        let key = record.natural_key();
        let result = async {
            endpoint.validate(record)?;
            let _guard = self.write_lock(&[E::CATEGORY]).await?;

            stage::<E>(Operation::Create, Stage::LocatingIndex, &key);
            let existing = self.fetch(endpoint).await?;
            if locate(endpoint, existing, &key).is_some() {
                return Err(Error::invalid(E::RESOURCE, format!("'{key}' already exists")));
            }

            stage::<E>(Operation::Create, Stage::Submitting, &key);
            self.submit(&endpoint.save_page(), endpoint.save_form(record), None)
                .await?;

            stage::<E>(Operation::Create, Stage::Verifying, &key);
            let after = self.fetch(endpoint).await?;
            locate(endpoint, after, &key).ok_or_else(|| not_found::<E>(&key))
        }
        .await;

        finish::<E, _>(Operation::Create, &key, result.map(|item| item.record))
    }

    /// Replace the record with the same natural key.
    ///
    /// The re-read afterwards only checks that the key is still present; it
    /// does not compare fields, since the console normalizes some values.
    pub(crate) async fn update_record<E: Endpoint>(
        &self,
        endpoint: &E,
        record: &E::Record,
    ) -> Result<E::Record, Error> {
        let key = record.natural_key();
        let result = async {
            endpoint.validate(record)?;
            let _guard = self.write_lock(&[E::CATEGORY]).await?;

            stage::<E>(Operation::Update, Stage::LocatingIndex, &key);
            let current = self.fetch(endpoint).await?;
            let position = locate(endpoint, current, &key)
                .ok_or_else(|| not_found::<E>(&key))?
                .index;

            stage::<E>(Operation::Update, Stage::Submitting, &key);
            self.submit(
                &endpoint.save_page(),
                endpoint.save_form(record),
                Some(position),
            )
            .await?;

            stage::<E>(Operation::Update, Stage::Verifying, &key);
            let after = self.fetch(endpoint).await?;
            locate(endpoint, after, &key).ok_or_else(|| not_found::<E>(&key))
        }
        .await;

        finish::<E, _>(Operation::Update, &key, result.map(|item| item.record))
    }

    pub(crate) async fn delete_record<E: Endpoint>(
        &self,
        endpoint: &E,
        key: &str,
    ) -> Result<(), Error> {
        let result = async {
            let _guard = self.write_lock(&[E::CATEGORY]).await?;

            stage::<E>(Operation::Delete, Stage::LocatingIndex, key);
            let current = self.fetch(endpoint).await?;
            let position = locate(endpoint, current, key)
                .ok_or_else(|| not_found::<E>(key))?
                .index;

            stage::<E>(Operation::Delete, Stage::Submitting, key);
            self.submit(
                &endpoint.delete_page(),
                endpoint.delete_form(),
                Some(position),
            )
            .await?;

            stage::<E>(Operation::Delete, Stage::Verifying, key);
            let after = self.fetch(endpoint).await?;
            match locate(endpoint, after, key) {
                Some(_) => Err(Error::StillExists {
                    resource: E::RESOURCE,
                    key: key.to_owned(),
                }),
                None => Ok(()),
            }
        }
        .await;

        finish::<E, _>(Operation::Delete, key, result)
    }

    async fn fetch<E: Endpoint>(&self, endpoint: &E) -> Result<Vec<Indexed<E::Record>>, Error> {
        let raw = self.read_subtree(&endpoint.config_path()).await?;
        endpoint.decode(raw)
    }
}

fn stage<E: Endpoint>(op: Operation, stage: Stage, key: &str) {
    debug!(resource = E::RESOURCE, ?op, %stage, key, "resource operation");
}

fn finish<E: Endpoint, T>(op: Operation, key: &str, result: Result<T, Error>) -> Result<T, Error> {
    match result {
        Ok(value) => {
            debug!(resource = E::RESOURCE, ?op, key, "resource operation done");
            Ok(value)
        }
        Err(e) => {
            debug!(resource = E::RESOURCE, ?op, key, error = %e, "resource operation failed");
            Err(Error::operation(op, E::RESOURCE, e))
        }
    }
}

//! AnkiConnect card store.
//!
//! Every call is a `POST` of `{action, version, params}` answered by
//! `{result, error}`.

mod models;

use base64::Engine;
use mdcards_core::{canonical_deck_name, CardKind, CardRecord, CardStore, NoteId, StoreError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub use models::{model_for, CreateModel};

/// AnkiConnect API version spoken by this client.
pub const API_VERSION: u32 = 6;

#[derive(Debug, Serialize)]
struct Request<'a, P> {
    action: &'a str,
    version: u32,
    params: P,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl Response {
    fn into_result<T: DeserializeOwned>(self, action: &str) -> Result<T, StoreError> {
        if let Some(message) = self.error {
            return Err(StoreError::Backend {
                action: action.to_string(),
                message,
            });
        }
        serde_json::from_value(self.result).map_err(|e| StoreError::Parse(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewNote<'a> {
    deck_name: String,
    model_name: &'static str,
    fields: BTreeMap<&'static str, &'a str>,
    tags: &'a [String],
    options: NoteOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteOptions {
    allow_duplicate: bool,
}

#[derive(Debug, Serialize)]
struct NoteUpdate<'a> {
    id: NoteId,
    fields: BTreeMap<&'static str, &'a str>,
    tags: &'a [String],
}

fn field_map(record: &CardRecord) -> BTreeMap<&'static str, &str> {
    record.fields().into_iter().collect()
}

fn new_note(record: &CardRecord) -> NewNote<'_> {
    NewNote {
        deck_name: canonical_deck_name(&record.deck_name),
        model_name: record.kind().template_name(),
        fields: field_map(record),
        tags: &record.tags,
        options: NoteOptions {
            allow_duplicate: true,
        },
    }
}

/// Ids of the `notesInfo` entries that describe a real note.
fn existing_ids(infos: &[Value]) -> HashSet<NoteId> {
    infos
        .iter()
        .filter_map(|info| info.get("noteId").and_then(Value::as_i64))
        .collect()
}

/// Per-action results of a `multi` call.
fn multi_results(responses: Vec<Value>) -> Vec<Result<Value, String>> {
    responses
        .into_iter()
        .map(|response| match response.get("error").and_then(Value::as_str) {
            Some(error) => Err(error.to_string()),
            None => Ok(response.get("result").cloned().unwrap_or(Value::Null)),
        })
        .collect()
}

/// Inner state shared across clones.
struct AnkiConnectInner {
    client: Client,
    url: String,
}

/// Card store backed by a running Anki with the AnkiConnect add-on.
///
/// This struct is Clone-able because it wraps all state in Arc.
#[derive(Clone)]
pub struct AnkiConnect {
    inner: Arc<AnkiConnectInner>,
}

impl AnkiConnect {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(AnkiConnectInner {
                client: Client::new(),
                url: url.into().trim_end_matches('/').to_string(),
            }),
        }
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// AnkiConnect version reported by the add-on.
    pub async fn version(&self) -> Result<u32, StoreError> {
        self.invoke("version", json!({})).await
    }

    async fn invoke<P, T>(&self, action: &str, params: P) -> Result<T, StoreError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let request = Request {
            action,
            version: API_VERSION,
            params,
        };

        let resp = self
            .inner
            .client
            .post(&self.inner.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Backend {
                action: action.to_string(),
                message: format!("HTTP {}: {}", status, message),
            });
        }

        let response: Response = resp
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;
        response.into_result(action)
    }

    async fn multi(&self, actions: Vec<Value>) -> Result<Vec<Result<Value, String>>, StoreError> {
        let responses: Vec<Value> = self.invoke("multi", json!({ "actions": actions })).await?;
        Ok(multi_results(responses))
    }

    /// `addNotes` rejects the whole batch on newer AnkiConnect versions when
    /// any note fails, so fall back to one `addNote` per record.
    async fn add_notes_individually(
        &self,
        records: &[CardRecord],
    ) -> Result<Vec<Option<NoteId>>, StoreError> {
        let actions = records
            .iter()
            .map(|record| {
                json!({
                    "action": "addNote",
                    "version": API_VERSION,
                    "params": { "note": new_note(record) },
                })
            })
            .collect();

        let results = self.multi(actions).await?;
        Ok(results
            .into_iter()
            .map(|result| match result {
                Ok(id) => id.as_i64(),
                Err(e) => {
                    tracing::warn!("note rejected: {}", e);
                    None
                }
            })
            .collect())
    }
}

impl CardStore for AnkiConnect {
    async fn check_connection(&self) -> Result<(), StoreError> {
        let version = self.version().await.map_err(|e| match e {
            StoreError::Network(message) => StoreError::Unavailable(message),
            other => other,
        })?;
        if version < API_VERSION {
            return Err(StoreError::Unavailable(format!(
                "AnkiConnect version {} is older than {}",
                version, API_VERSION
            )));
        }
        Ok(())
    }

    async fn find_existing(&self, ids: &[NoteId]) -> Result<HashSet<NoteId>, StoreError> {
        let infos: Vec<Value> = self.invoke("notesInfo", json!({ "notes": ids })).await?;
        Ok(existing_ids(&infos))
    }

    async fn create_batch(&self, records: &[CardRecord]) -> Result<Vec<Option<NoteId>>, StoreError> {
        let notes: Vec<NewNote> = records.iter().map(new_note).collect();
        match self
            .invoke::<_, Vec<Option<NoteId>>>("addNotes", json!({ "notes": notes }))
            .await
        {
            Ok(ids) => Ok(ids),
            Err(StoreError::Backend { message, .. }) => {
                tracing::debug!("addNotes failed ({}), adding notes one by one", message);
                self.add_notes_individually(records).await
            }
            Err(e) => Err(e),
        }
    }

    async fn update_batch(&self, records: &[CardRecord]) -> Result<Vec<bool>, StoreError> {
        let mut outcomes = vec![false; records.len()];
        let mut actions = Vec::new();
        let mut positions = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            let Some(id) = record.id else {
                continue;
            };
            let note = NoteUpdate {
                id,
                fields: field_map(record),
                tags: &record.tags,
            };
            actions.push(json!({
                "action": "updateNote",
                "version": API_VERSION,
                "params": { "note": note },
            }));
            positions.push(idx);
        }
        if actions.is_empty() {
            return Ok(outcomes);
        }

        let results = self.multi(actions).await?;
        for (idx, result) in positions.into_iter().zip(results) {
            match result {
                Ok(_) => outcomes[idx] = true,
                Err(e) => tracing::warn!("updating note {:?} failed: {}", records[idx].id, e),
            }
        }
        Ok(outcomes)
    }

    async fn ensure_deck(&self, name: &str) -> Result<(), StoreError> {
        let _: Value = self
            .invoke("createDeck", json!({ "deck": canonical_deck_name(name) }))
            .await?;
        Ok(())
    }

    async fn ensure_templates(&self) -> Result<(), StoreError> {
        let existing: Vec<String> = self.invoke("modelNames", json!({})).await?;
        for kind in CardKind::all() {
            if existing.iter().any(|name| name == kind.template_name()) {
                continue;
            }
            tracing::info!("creating note type {}", kind.template_name());
            let _: Value = self.invoke("createModel", model_for(kind)).await?;
        }
        Ok(())
    }

    async fn delete_batch(&self, ids: &[NoteId]) -> Result<(), StoreError> {
        let _: Value = self.invoke("deleteNotes", json!({ "notes": ids })).await?;
        Ok(())
    }

    async fn upload_media(&self, filename: &str, bytes: &[u8]) -> Result<bool, StoreError> {
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        let stored: Value = self
            .invoke(
                "storeMediaFile",
                json!({ "filename": filename, "data": data }),
            )
            .await?;
        Ok(!stored.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdcards_core::CardContent;
    use pretty_assertions::assert_eq;

    fn record() -> CardRecord {
        CardRecord {
            id: Some(42),
            deck_name: "Languages/French".to_string(),
            content: CardContent::Reversed {
                front: "chat".to_string(),
                back: "cat".to_string(),
            },
            source: "french.md".to_string(),
            tags: vec!["vocab".to_string()],
        }
    }

    #[test]
    fn test_new_note_payload() {
        let value = serde_json::to_value(new_note(&record())).unwrap();
        assert_eq!(
            value,
            json!({
                "deckName": "Languages::French",
                "modelName": "mdcards Basic (and reversed card)",
                "fields": { "Back": "cat", "Front": "chat", "Source": "french.md" },
                "tags": ["vocab"],
                "options": { "allowDuplicate": true },
            })
        );
    }

    #[test]
    fn test_update_payload_carries_id() {
        let record = record();
        let update = NoteUpdate {
            id: 42,
            fields: field_map(&record),
            tags: &record.tags,
        };
        let value = serde_json::to_value(update).unwrap();
        assert_eq!(value["id"], 42);
        assert_eq!(value["fields"]["Front"], "chat");
    }

    #[test]
    fn test_missing_notes_are_empty_objects() {
        let infos = vec![json!({ "noteId": 1, "fields": {} }), json!({}), json!({ "noteId": 3 })];
        assert_eq!(existing_ids(&infos), HashSet::from([1, 3]));
    }

    #[test]
    fn test_multi_results() {
        let responses = vec![
            json!({ "result": 17, "error": null }),
            json!({ "result": null, "error": "cannot create note because it is empty" }),
        ];
        let results = multi_results(responses);
        assert_eq!(results[0], Ok(json!(17)));
        assert_eq!(
            results[1],
            Err("cannot create note because it is empty".to_string())
        );
    }

    #[test]
    fn test_response_error_wins() {
        let response: Response =
            serde_json::from_value(json!({ "result": null, "error": "model was not found" }))
                .unwrap();
        match response.into_result::<Vec<i64>>("addNotes") {
            Err(StoreError::Backend { action, message }) => {
                assert_eq!(action, "addNotes");
                assert_eq!(message, "model was not found");
            }
            other => panic!("Expected Backend error, got {:?}", other),
        }
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        assert_eq!(AnkiConnect::new("http://localhost:8765/").url(), "http://localhost:8765");
    }
}

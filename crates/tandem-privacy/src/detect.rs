// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Person and organization name detection through the local model.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use tandem_core::TandemError;
use tandem_local::LocalAdapter;

use crate::entity::{EntityKind, PiiEntity};

const DETECTOR_SYSTEM: &str = "You find the names of people and organizations in text for a \
privacy filter. You report nothing else.";

#[derive(Debug, Deserialize, JsonSchema)]
struct DetectedEntities {
    entities: Vec<DetectedEntity>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DetectedEntity {
    /// The name exactly as written in the text.
    name: String,
    #[serde(rename = "type")]
    kind: EntityKind,
}

fn detection_prompt(text: &str) -> String {
    format!(
        "List every name of a person or an organization that appears in the text below.\n\
         Report:\n\
         - people: first names, last names or full names\n\
         - organizations: companies, institutions, agencies\n\
         Ignore addresses, phone numbers, email addresses, ages, dates, places and job titles.\n\
         Ignore generic references such as \"my boss\" or \"the company\".\n\
         Answer only with JSON like \
         {{\"entities\": [{{\"name\": \"Ada Lovelace\", \"type\": \"person\"}}, \
         {{\"name\": \"Initech\", \"type\": \"organization\"}}]}}.\n\n\
         Text:\n{text}"
    )
}

/// Ask the local model for the names in `text` and locate each one.
///
/// Names that do not occur in `text` are dropped. Any call or parse failure is
/// a [`TandemError::Redaction`].
pub async fn detect_entities(
    local: &LocalAdapter,
    text: &str,
    max_tokens: u32,
) -> Result<Vec<PiiEntity>, TandemError> {
    let detected: DetectedEntities = local
        .structured(DETECTOR_SYSTEM, &detection_prompt(text), 0.0, max_tokens)
        .await
        .map_err(|e| TandemError::Redaction(format!("entity detection failed: {e}")))?;

    let reported = detected.entities.len();
    let entities: Vec<PiiEntity> = detected
        .entities
        .into_iter()
        .filter_map(|d| {
            let located = PiiEntity::locate(&d.name, d.kind, text);
            if located.is_none() {
                warn!(kind = ?d.kind, "discarding detected entity not present in text");
            }
            located
        })
        .collect();

    debug!(reported, located = entities.len(), "entities detected");
    Ok(entities)
}

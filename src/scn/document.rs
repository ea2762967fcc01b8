// Scenario documents and share links.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{SecondsFormat, Utc};

use crate::scn::*;

pub const DOCUMENT_VERSION: &str = "1.0";

// Query parameters that carry a share payload. The second one is written by older versions.
const SHARE_PARAMS: [&str; 2] = ["scenario", "simulacao"];

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// The exported form of a scenario, also used for the --state file.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDocument {
    #[serde(alias = "versao", default = "default_version")]
    pub version: String,
    #[serde(
        rename = "exportTimestamp",
        alias = "dataExportacao",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub export_timestamp: Option<String>,
    #[serde(rename = "roundMode", alias = "turno")]
    pub round_mode: RoundMode,
    #[serde(alias = "candidatos")]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "voteMatrix", alias = "votosPorEstado")]
    pub vote_matrix: VoteMatrix,
}

// The share payload leaves out the version and the timestamp.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct SharePayload {
    #[serde(rename = "roundMode", alias = "turno")]
    round_mode: RoundMode,
    #[serde(alias = "candidatos")]
    candidates: Vec<Candidate>,
    #[serde(rename = "voteMatrix", alias = "votosPorEstado")]
    vote_matrix: VoteMatrix,
}

impl ScenarioDocument {
    /// A snapshot of the store, stamped with the current time.
    pub fn from_store(store: &ScenarioStore) -> ScenarioDocument {
        ScenarioDocument {
            version: DOCUMENT_VERSION.to_string(),
            export_timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            round_mode: store.round_mode(),
            candidates: store.candidates().to_vec(),
            vote_matrix: store.votes().clone(),
        }
    }

    /// Builds a new store. The caller's store is only replaced on success.
    pub fn into_store(self) -> ScnResult<ScenarioStore> {
        if self.version != DOCUMENT_VERSION {
            warn!(
                "into_store: document version {:?}, expected {:?}",
                self.version, DOCUMENT_VERSION
            );
        }
        ScenarioStore::from_parts(self.round_mode, self.candidates, self.vote_matrix)
            .context(InvalidScenarioSnafu {})
    }
}

pub fn parse_document(contents: &str) -> ScnResult<ScenarioDocument> {
    let doc: ScenarioDocument = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    debug!(
        "parse_document: version {} exported at {:?}",
        doc.version, doc.export_timestamp
    );
    Ok(doc)
}

pub fn read_document(path: &str) -> ScnResult<ScenarioDocument> {
    info!("read_document: reading {:?}", path);
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    parse_document(&contents)
}

pub fn write_document(path: &str, store: &ScenarioStore) -> ScnResult<()> {
    let doc = ScenarioDocument::from_store(store);
    let js = serde_json::to_string_pretty(&doc).context(ParsingJsonSnafu {})?;
    fs::write(path, js).context(WritingFileSnafu { path })?;
    info!("write_document: scenario written to {:?}", path);
    Ok(())
}

/// The base64 payload of a share link.
pub fn encode_share_payload(store: &ScenarioStore) -> ScnResult<String> {
    let payload = SharePayload {
        round_mode: store.round_mode(),
        candidates: store.candidates().to_vec(),
        vote_matrix: store.votes().clone(),
    };
    let js = serde_json::to_string(&payload).context(ParsingJsonSnafu {})?;
    Ok(BASE64.encode(js.as_bytes()))
}

pub fn share_link(base_url: &str, store: &ScenarioStore) -> ScnResult<String> {
    let payload = encode_share_payload(store)?;
    let sep = if base_url.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}{}={}",
        base_url,
        sep,
        SHARE_PARAMS[0],
        urlencoding::encode(&payload)
    ))
}

// Finds the payload in a link, or takes the whole input as a payload.
fn extract_payload(input: &str) -> &str {
    let query = match input.split_once('?') {
        Some((_, q)) => q,
        None => return input.trim(),
    };
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if SHARE_PARAMS.contains(&key) {
                return value.trim();
            }
        }
    }
    input.trim()
}

/// Reads a share link or a bare payload.
pub fn decode_share(input: &str) -> ScnResult<ScenarioStore> {
    let payload = urlencoding::decode(extract_payload(input)).context(DecodingLinkSnafu {})?;
    debug!("decode_share: payload of {} bytes", payload.len());
    let bytes = BASE64.decode(payload.as_bytes()).context(DecodingShareSnafu {})?;
    let js = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => whatever!("The share payload is not UTF-8 text: {}", e),
    };
    let p: SharePayload = serde_json::from_str(&js).context(ParsingJsonSnafu {})?;
    ScenarioStore::from_parts(p.round_mode, p.candidates, p.vote_matrix)
        .context(InvalidScenarioSnafu {})
}

//! Flussonic API payloads.
//!
//! Upstream JSON is lenient: missing or `null` fields decode to their zero
//! value instead of failing the whole response.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Substring marking a session type as DVR playback.
pub const DVR_SESSION_MARKER: &str = "dvr";

/// Title and comment of the pseudo-stream used for sessions on unknown streams.
pub const NOT_FOUND: &str = "NOT FOUND";

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A decoded API response with its fetch metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    /// API path that was requested.
    pub url: &'static str,
    /// Time until the response headers arrived.
    pub request_duration: Duration,
    pub data: T,
}

/// `/flussonic/api/server` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ServerInfo {
    #[serde(default, deserialize_with = "null_default")]
    pub total_clients: f64,
}

/// Runtime statistics of one stream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamStats {
    #[serde(deserialize_with = "null_default")]
    pub bitrate: f64,
    #[serde(deserialize_with = "null_default")]
    pub alive: bool,
    #[serde(deserialize_with = "null_default")]
    pub client_count: f64,
    #[serde(deserialize_with = "null_default")]
    pub dvr_enabled: bool,
    #[serde(deserialize_with = "null_default")]
    pub input_error_rate: f64,
    #[serde(deserialize_with = "null_default")]
    pub lifetime: f64,
    #[serde(deserialize_with = "null_default")]
    pub retry_count: f64,
    #[serde(deserialize_with = "null_default")]
    pub running_transcoder: bool,
}

/// Configured options of one stream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    #[serde(deserialize_with = "null_default")]
    pub disabled: bool,
    #[serde(deserialize_with = "null_default")]
    pub title: String,
    #[serde(deserialize_with = "null_default")]
    pub comment: String,
}

/// One stream from the media listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Stream {
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub stats: StreamStats,
    #[serde(deserialize_with = "null_default")]
    pub options: StreamOptions,
}

impl Stream {
    /// Stand-in for a stream referenced by sessions but absent from the listing.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats: StreamStats::default(),
            options: StreamOptions {
                disabled: false,
                title: NOT_FOUND.to_string(),
                comment: NOT_FOUND.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct MediaEntry {
    #[serde(default, deserialize_with = "null_default")]
    entry: String,
    #[serde(default)]
    value: serde_json::Value,
}

/// `/flussonic/api/media` payload, streams keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Media {
    pub streams: BTreeMap<String, Stream>,
}

impl Media {
    /// Decode the entry envelope, keeping only `"entry": "stream"` items.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let entries: Vec<MediaEntry> = serde_json::from_slice(body)?;
        let mut streams = BTreeMap::new();
        for entry in entries.into_iter().filter(|e| e.entry == "stream") {
            let stream: Stream = match entry.value {
                serde_json::Value::Null => Stream::default(),
                value => serde_json::from_value(value)?,
            };
            streams.insert(stream.name.clone(), stream);
        }
        Ok(Self { streams })
    }
}

#[derive(Debug, Deserialize)]
struct SessionEntry {
    #[serde(default, deserialize_with = "null_default")]
    name: String,
    #[serde(default, rename = "type", deserialize_with = "null_default")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct SessionsEnvelope {
    #[serde(default, deserialize_with = "null_default")]
    sessions: Vec<SessionEntry>,
}

/// Client totals of one stream aggregated from the session listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaSessions {
    pub name: String,
    pub total_clients: f64,
    pub dvr_clients: f64,
    /// Session count per session type (`hls`, `mp4`, `hls-dvr`, ...).
    pub types: BTreeMap<String, f64>,
}

/// `/flussonic/api/sessions` payload aggregated per stream name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sessions {
    pub streams: BTreeMap<String, MediaSessions>,
}

impl Sessions {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: SessionsEnvelope = serde_json::from_slice(body)?;
        let mut streams: BTreeMap<String, MediaSessions> = BTreeMap::new();
        for session in envelope.sessions {
            let agg = streams
                .entry(session.name.clone())
                .or_insert_with(|| MediaSessions {
                    name: session.name.clone(),
                    ..Default::default()
                });
            agg.total_clients += 1.0;
            if session.kind.contains(DVR_SESSION_MARKER) {
                agg.dvr_clients += 1.0;
            }
            *agg.types.entry(session.kind).or_default() += 1.0;
        }
        Ok(Self { streams })
    }

    /// DVR clients across all streams.
    pub fn total_dvr_clients(&self) -> f64 {
        self.streams.values().map(|s| s.dvr_clients).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_decodes() {
        let info: ServerInfo =
            serde_json::from_str(r#"{"total_clients": 5, "uptime": 100}"#).unwrap();
        assert_eq!(info.total_clients, 5.0);

        let info: ServerInfo = serde_json::from_str(r#"{"total_clients": null}"#).unwrap();
        assert_eq!(info.total_clients, 0.0);
    }

    #[test]
    fn test_media_keeps_only_stream_entries() {
        let body = br#"[
            {"entry": "stream", "value": {
                "name": "cam1",
                "stats": {"bitrate": 1200, "alive": true, "retry_count": 2,
                          "input_error_rate": 0.01, "dvr_enabled": false,
                          "running_transcoder": false},
                "options": {"title": "Camera 1", "comment": ""}
            }},
            {"entry": "file", "value": {"name": "vod/movie.mp4"}},
            {"entry": "stream", "value": {"name": "cam2", "options": {"title": null}}}
        ]"#;

        let media = Media::from_json(body).unwrap();
        assert_eq!(media.streams.len(), 2);

        let cam1 = &media.streams["cam1"];
        assert_eq!(cam1.stats.bitrate, 1200.0);
        assert!(cam1.stats.alive);
        assert_eq!(cam1.stats.retry_count, 2.0);
        assert_eq!(cam1.options.title, "Camera 1");

        let cam2 = &media.streams["cam2"];
        assert_eq!(cam2.stats, StreamStats::default());
        assert_eq!(cam2.options.title, "");
    }

    #[test]
    fn test_media_tolerates_null_envelope_fields() {
        let body = br#"[
            {"entry": "stream", "value": {"name": "cam1"}},
            {"value": {"name": "orphan"}},
            {"entry": null, "value": {}},
            {"entry": "stream", "value": null}
        ]"#;

        let media = Media::from_json(body).unwrap();
        assert_eq!(media.streams.len(), 2);
        assert!(media.streams.contains_key("cam1"));
        assert!(!media.streams.contains_key("orphan"));
        assert_eq!(media.streams[""], Stream::default());
    }

    #[test]
    fn test_media_rejects_malformed_body() {
        assert!(Media::from_json(br#"{"not": "a list"}"#).is_err());
        assert!(Media::from_json(b"garbage").is_err());
    }

    #[test]
    fn test_sessions_aggregate_per_stream() {
        let body = br#"{"event": "user_list", "sessions": [
            {"name": "cam1", "type": "mp4"},
            {"name": "cam1", "type": "hls-dvr"},
            {"name": "cam1", "type": "hls"},
            {"name": "cam2", "type": "dvr"}
        ]}"#;

        let sessions = Sessions::from_json(body).unwrap();
        assert_eq!(sessions.streams.len(), 2);

        let cam1 = &sessions.streams["cam1"];
        assert_eq!(cam1.total_clients, 3.0);
        assert_eq!(cam1.dvr_clients, 1.0);
        assert_eq!(cam1.types["hls"], 1.0);
        assert_eq!(cam1.types["hls-dvr"], 1.0);

        assert_eq!(sessions.streams["cam2"].dvr_clients, 1.0);
        assert_eq!(sessions.total_dvr_clients(), 2.0);
    }

    #[test]
    fn test_dvr_rule_is_case_sensitive_substring() {
        let body = br#"{"sessions": [
            {"name": "a", "type": "DVR"},
            {"name": "a", "type": "hlsdvrx"}
        ]}"#;
        let sessions = Sessions::from_json(body).unwrap();
        assert_eq!(sessions.streams["a"].dvr_clients, 1.0);
    }

    #[test]
    fn test_sessions_without_list_is_empty() {
        let sessions = Sessions::from_json(br#"{"event": "user_list"}"#).unwrap();
        assert!(sessions.streams.is_empty());
        assert_eq!(sessions.total_dvr_clients(), 0.0);
    }

    #[test]
    fn test_not_found_stream() {
        let stream = Stream::not_found("ghost");
        assert_eq!(stream.name, "ghost");
        assert_eq!(stream.options.title, NOT_FOUND);
        assert_eq!(stream.options.comment, NOT_FOUND);
        assert!(!stream.stats.dvr_enabled);
        assert!(!stream.stats.running_transcoder);
    }
}

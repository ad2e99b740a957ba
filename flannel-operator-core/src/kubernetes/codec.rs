//! Conversion between [`FlannelNetwork`] and the untyped representation used
//! by the dynamic API, plus decoding of raw watch streams.
//!
//! The dynamic API drops type metadata from objects it hands back, so every
//! conversion stamps `apiVersion` and `kind` regardless of what the input
//! carried.

use futures::{io::Lines, AsyncBufRead, AsyncBufReadExt, Stream, StreamExt};
use kube::{
    core::{DynamicObject, ErrorResponse, TypeMeta},
    Resource,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::resources::crd::v1alpha1::flannel_network::FlannelNetwork;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Couldn't (de)serialize the resource! Reason: {}", .0)]
    Serialization(serde_json::Error),
    #[error("Resource isn't a JSON object!")]
    NotAnObject,
    #[error("Couldn't read from the watch stream! Reason: {}", .0)]
    Io(std::io::Error),
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("API server reported a watch error: {}", .0)]
    Api(ErrorResponse),
    #[error("Couldn't decode a watch frame! Reason: {}", .0)]
    Decode(CodecError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

#[derive(Debug)]
pub enum NetworkWatchEvent {
    Added(FlannelNetwork),
    Modified(FlannelNetwork),
    Deleted(FlannelNetwork),
    Bookmark { resource_version: Option<String> },
    Error(WatchError),
}

#[derive(Deserialize)]
struct WatchFrame {
    #[serde(rename = "type", alias = "Type")]
    event_type: WatchEventType,
    #[serde(alias = "Object")]
    object: Value,
}

pub fn flannel_network_type_meta() -> TypeMeta {
    TypeMeta {
        api_version: FlannelNetwork::api_version(&()).into_owned(),
        kind: FlannelNetwork::kind(&()).into_owned(),
    }
}

pub fn to_dynamic(network: &FlannelNetwork) -> Result<DynamicObject, CodecError> {
    let value = stamp(serde_json::to_value(network).map_err(CodecError::Serialization)?)?;
    let mut object: DynamicObject =
        serde_json::from_value(value).map_err(CodecError::Serialization)?;

    object.types = Some(flannel_network_type_meta());

    Ok(object)
}

pub fn from_dynamic(object: DynamicObject) -> Result<FlannelNetwork, CodecError> {
    from_value(serde_json::to_value(object).map_err(CodecError::Serialization)?)
}

pub fn from_value(value: Value) -> Result<FlannelNetwork, CodecError> {
    serde_json::from_value(stamp(value)?).map_err(CodecError::Serialization)
}

fn stamp(value: Value) -> Result<Value, CodecError> {
    let mut object: Map<String, Value> = match value {
        Value::Object(object) => object,
        _ => return Err(CodecError::NotAnObject),
    };
    let type_meta = flannel_network_type_meta();

    object.insert("apiVersion".to_owned(), Value::String(type_meta.api_version));
    object.insert("kind".to_owned(), Value::String(type_meta.kind));

    Ok(Value::Object(object))
}

/// Decodes a single `{type, object}` watch frame.
pub fn decode_watch_frame(frame: &str) -> Result<NetworkWatchEvent, CodecError> {
    let frame: WatchFrame = serde_json::from_str(frame).map_err(CodecError::Serialization)?;

    Ok(match frame.event_type {
        WatchEventType::Added => NetworkWatchEvent::Added(from_value(frame.object)?),
        WatchEventType::Modified => NetworkWatchEvent::Modified(from_value(frame.object)?),
        WatchEventType::Deleted => NetworkWatchEvent::Deleted(from_value(frame.object)?),
        WatchEventType::Bookmark => NetworkWatchEvent::Bookmark {
            resource_version: frame
                .object
                .pointer("/metadata/resourceVersion")
                .and_then(Value::as_str)
                .map(str::to_owned),
        },
        WatchEventType::Error => NetworkWatchEvent::Error(WatchError::Api(
            serde_json::from_value(frame.object).map_err(CodecError::Serialization)?,
        )),
    })
}

/// A watch over `FlannelNetwork` resources backed by a newline-delimited
/// stream of JSON frames.
///
/// A frame that can't be decoded produces one [`NetworkWatchEvent::Error`]
/// and closes the watch.
pub struct NetworkWatch<R> {
    lines: Option<Lines<R>>,
}

impl<R: AsyncBufRead + Unpin> NetworkWatch<R> {
    pub fn new(body: R) -> Self {
        Self {
            lines: Some(body.lines()),
        }
    }

    pub async fn next_event(&mut self) -> Option<NetworkWatchEvent> {
        loop {
            let line = self.lines.as_mut()?.next().await;

            match line {
                None => {
                    self.close();
                    return None;
                }
                Some(Err(error)) => {
                    self.close();
                    return Some(NetworkWatchEvent::Error(WatchError::Decode(
                        CodecError::Io(error),
                    )));
                }
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => match decode_watch_frame(&line) {
                    Ok(event) => return Some(event),
                    Err(error) => {
                        self.close();
                        return Some(NetworkWatchEvent::Error(WatchError::Decode(error)));
                    }
                },
            }
        }
    }

    /// Drops the underlying body, releasing the connection.
    pub fn close(&mut self) {
        self.lines = None;
    }

    pub fn is_closed(&self) -> bool {
        self.lines.is_none()
    }

    pub fn into_stream(self) -> impl Stream<Item = NetworkWatchEvent> {
        futures::stream::unfold(self, |mut watch| async move {
            let event = watch.next_event().await?;
            Some((event, watch))
        })
    }
}

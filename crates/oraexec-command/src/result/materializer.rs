//! Output materialization

use oraexec_core::{LobStream, NativeParameter, Result, Value};
use serde::Serialize;

use super::shape::{Payload, ReturnShape};
use super::xml::{XmlDocument, XmlElement};

/// Render the output of a call in the requested shape.
///
/// `AffectedRows` and `RawParameters` return without looking at the
/// parameter values. The other shapes read every output value, which
/// consumes LOB streams.
pub fn materialize(
    outputs: &[NativeParameter],
    affected_rows: u64,
    shape: ReturnShape,
) -> Result<Payload> {
    let payload = match shape {
        ReturnShape::AffectedRows => Payload::AffectedRows(affected_rows),
        ReturnShape::RawParameters => Payload::Parameters(outputs.to_vec()),
        ReturnShape::XmlDocument => Payload::Xml(parameters_to_xml(outputs)?),
        ReturnShape::XmlString => Payload::XmlText(parameters_to_xml(outputs)?.to_xml_string()?),
        ReturnShape::JsonString => Payload::Json(parameters_to_json(outputs)?),
    };
    tracing::debug!(shape = %shape, outputs = outputs.len(), "output materialized");
    Ok(payload)
}

/// One element per output parameter under `Root`, named after the
/// parameter, holding the text of its value
pub fn parameters_to_xml(outputs: &[NativeParameter]) -> Result<XmlDocument> {
    let mut doc = XmlDocument::new();
    for param in outputs {
        let element = XmlElement::with_text(param.name.as_str(), parameter_text(param)?)?;
        doc.root_mut().push(element);
    }
    Ok(doc)
}

fn parameter_text(param: &NativeParameter) -> Result<Option<String>> {
    match decoded_character_lob(param) {
        Some(text) => text.map(Some),
        None => param.value.to_text(),
    }
}

fn parameter_json(param: &NativeParameter) -> Result<serde_json::Value> {
    match decoded_character_lob(param) {
        Some(text) => text.map(serde_json::Value::String),
        None => param.value.to_json(),
    }
}

/// Some drivers hand character LOBs back as raw UTF-16LE bytes
fn decoded_character_lob(param: &NativeParameter) -> Option<Result<String>> {
    match &param.value {
        Value::Bytes(bytes) if param.db_type.is_character_lob() => {
            Some(LobStream::from_utf16le(bytes.clone()).read_to_string())
        }
        _ => None,
    }
}

#[derive(Serialize)]
struct JsonParameter<'a> {
    name: &'a str,
    value: serde_json::Value,
    #[serde(rename = "type")]
    data_type: &'static str,
}

/// JSON array of `{"name", "value", "type"}` records, built directly from
/// the parameters
pub fn parameters_to_json(outputs: &[NativeParameter]) -> Result<String> {
    let records = outputs
        .iter()
        .map(|param| {
            Ok(JsonParameter {
                name: &param.name,
                value: parameter_json(param)?,
                data_type: param.db_type.as_str(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string(&records)?)
}

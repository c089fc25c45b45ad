//! Result shapes and output materialization
//!
//! After a command runs, its output parameters are rendered in the shape the
//! caller asked for. XML and JSON are built independently: XML carries only
//! each parameter's name and text, while JSON serializes the parameters
//! themselves, including their declared type.

mod materializer;
mod shape;
mod xml;

pub use materializer::{materialize, parameters_to_json, parameters_to_xml};
pub use shape::{Payload, ReturnShape};
pub use xml::{XmlDocument, XmlElement};

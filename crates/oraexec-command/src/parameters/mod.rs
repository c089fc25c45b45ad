//! Parameter specification, binding and placeholder extraction
//!
//! Callers describe parameters as [`ParameterSpec`]s. The codec validates
//! each spec against its declared [`OracleDbType`](oraexec_core::OracleDbType)
//! and produces the driver-native form. Inputs are bound first in the order
//! supplied, then outputs, which matters when binding by position.
//!
//! # Example
//!
//! ```ignore
//! use oraexec_command::parameters::{ParameterSpec, bind_all};
//! use oraexec_core::OracleDbType;
//!
//! let inputs = vec![ParameterSpec::new("p", OracleDbType::Varchar2, "x")];
//! let outputs = vec![ParameterSpec::output("returnVal", OracleDbType::Varchar2).with_size(255)];
//! let native = bind_all(&inputs, &outputs)?;
//! ```

mod codec;
mod extractor;
mod spec;

pub use codec::{bind_all, check_placeholders, from_native, to_native};
pub use extractor::{Placeholder, extract_placeholders};
pub use spec::{DataTypeRef, ParameterDef, ParameterSpec, coerce_json};

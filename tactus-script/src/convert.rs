//! JSON <-> `rhai::Dynamic` conversion.
//!
//! Every capability method crosses the script/host boundary with
//! `serde_json::Value` on the host side, the way the rest of the workspace
//! already standardizes on JSON for extension data (tool inputs, effect
//! payloads, state values). `rhai`'s `serde` feature gives us `to_dynamic`/
//! `from_dynamic` for free instead of hand-rolling a `Dynamic` walker.

use crate::error::ScriptError;
use rhai::Dynamic;

/// Convert a `serde_json::Value` into a `Dynamic` a script can read.
pub fn json_to_dynamic(value: &serde_json::Value) -> Result<Dynamic, ScriptError> {
    rhai::serde::to_dynamic(value).map_err(|e| ScriptError::Conversion(e.to_string()))
}

/// Convert whatever a script produced back into JSON for the host side.
pub fn dynamic_to_json(value: Dynamic) -> Result<serde_json::Value, ScriptError> {
    rhai::serde::from_dynamic(&value).map_err(|e| ScriptError::Conversion(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_an_object() {
        let value = json!({"a": 1, "b": [true, "x"], "c": null});
        let dyn_value = json_to_dynamic(&value).unwrap();
        let back = dynamic_to_json(dyn_value).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn round_trips_a_scalar() {
        let value = json!(42);
        let dyn_value = json_to_dynamic(&value).unwrap();
        assert_eq!(dynamic_to_json(dyn_value).unwrap(), value);
    }
}

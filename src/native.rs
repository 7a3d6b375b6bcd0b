//! Node bindings (feature `napi`).

use napi_derive::napi;
use serde_json::Value;

use crate::compiler::CompileOptions;
use crate::runtime::compile;

fn parse_options(options_json: Option<String>) -> napi::Result<CompileOptions> {
    match options_json {
        Some(json) => {
            serde_json::from_str(&json).map_err(|e| napi::Error::from_reason(e.to_string()))
        }
        None => Ok(CompileOptions::default()),
    }
}

#[napi]
pub fn render_template_native(
    template: String,
    state_json: String,
    options_json: Option<String>,
) -> napi::Result<String> {
    let options = parse_options(options_json)?;
    let state: Value =
        serde_json::from_str(&state_json).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let artifact =
        compile(&template, &options).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    Ok((artifact.render)(&state).to_html())
}

/// Compiler error for `template` as JSON, or `null` when it compiles.
#[napi]
pub fn check_template_native(
    template: String,
    options_json: Option<String>,
) -> napi::Result<Option<Value>> {
    let options = parse_options(options_json)?;
    match compile(&template, &options) {
        Ok(_) => Ok(None),
        Err(e) => serde_json::to_value(e)
            .map(Some)
            .map_err(|e| napi::Error::from_reason(e.to_string())),
    }
}

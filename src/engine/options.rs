use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{Attributes, Size};
use crate::error::{BindingError, BindingResult};

pub const ENGINE_OPTIONS_JSON_SCHEMA_V1: u32 = 1;

/// Engine construction options.
///
/// Common fields are typed; anything else the engine understands travels in
/// `extra` untouched. Equality is deep content equality.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineOptions {
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub min_zoom: Option<f64>,
    #[serde(default)]
    pub max_zoom: Option<f64>,
    #[serde(default)]
    pub detect_retina: Option<bool>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptionsJsonContractV1 {
    pub schema_version: u32,
    pub options: EngineOptions,
}

impl EngineOptions {
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Loads options from either a bare options object or a versioned
    /// `{ schema_version, options }` payload.
    pub fn from_json_compat_str(input: &str) -> BindingResult<Self> {
        if let Ok(payload) = serde_json::from_str::<EngineOptionsJsonContractV1>(input) {
            if payload.schema_version != ENGINE_OPTIONS_JSON_SCHEMA_V1 {
                return Err(BindingError::InvalidConfig(format!(
                    "unsupported engine options schema version: {}",
                    payload.schema_version
                )));
            }
            return Ok(payload.options);
        }
        serde_json::from_str::<Self>(input).map_err(|e| {
            BindingError::InvalidConfig(format!("failed to parse engine options json: {e}"))
        })
    }

    pub fn to_json_contract_v1_pretty(&self) -> BindingResult<String> {
        let payload = EngineOptionsJsonContractV1 {
            schema_version: ENGINE_OPTIONS_JSON_SCHEMA_V1,
            options: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            BindingError::InvalidConfig(format!("failed to serialize engine options contract v1: {e}"))
        })
    }
}

/// Visual theme: default attributes plus hover/selection looks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub node_attributes: Attributes,
    #[serde(default)]
    pub edge_attributes: Attributes,
    #[serde(default)]
    pub hovered_node_attributes: Attributes,
    #[serde(default)]
    pub hovered_edge_attributes: Attributes,
    #[serde(default)]
    pub selected_node_attributes: Attributes,
    #[serde(default)]
    pub selected_edge_attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoModeOptions {
    #[serde(default)]
    pub tiles_url: Option<String>,
    #[serde(default = "default_latitude_path")]
    pub latitude_path: String,
    #[serde(default = "default_longitude_path")]
    pub longitude_path: String,
    /// Transition length in milliseconds.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub min_zoom_level: Option<u8>,
    #[serde(default)]
    pub max_zoom_level: Option<u8>,
}

fn default_latitude_path() -> String {
    "latitude".to_owned()
}

fn default_longitude_path() -> String {
    "longitude".to_owned()
}

impl Default for GeoModeOptions {
    fn default() -> Self {
        Self {
            tiles_url: None,
            latitude_path: default_latitude_path(),
            longitude_path: default_longitude_path(),
            duration: None,
            min_zoom_level: None,
            max_zoom_level: None,
        }
    }
}

/// Host element an engine renders into.
///
/// Cloning shares the element; its size can change under the engine, which
/// picks it up on `Engine::resize`.
#[derive(Debug, Clone)]
pub struct Container {
    id: Rc<str>,
    size: Rc<Cell<Size>>,
}

impl Container {
    #[must_use]
    pub fn new(id: &str, size: Size) -> Self {
        Self {
            id: Rc::from(id),
            size: Rc::new(Cell::new(size)),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size.get()
    }

    pub fn set_size(&self, size: Size) {
        self.size.set(size);
    }

    #[must_use]
    pub fn same_element(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.size, &other.size)
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineOptions, ENGINE_OPTIONS_JSON_SCHEMA_V1};

    #[test]
    fn options_load_from_bare_and_versioned_json() {
        let bare = EngineOptions::from_json_compat_str(
            r#"{ "background_color": "white", "renderer": "canvas" }"#,
        )
        .expect("bare options");
        assert_eq!(bare.background_color.as_deref(), Some("white"));
        assert_eq!(bare.extra.get("renderer"), Some(&serde_json::Value::from("canvas")));

        let versioned = bare.to_json_contract_v1_pretty().expect("serialize");
        let reloaded = EngineOptions::from_json_compat_str(&versioned).expect("reload");
        assert_eq!(reloaded, bare);

        let future = format!(
            r#"{{ "schema_version": {}, "options": {{}} }}"#,
            ENGINE_OPTIONS_JSON_SCHEMA_V1 + 1
        );
        assert!(EngineOptions::from_json_compat_str(&future).is_err());
    }
}

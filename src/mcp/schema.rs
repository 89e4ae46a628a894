// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! MCP Protocol Schema Definitions
//!
//! Typed definitions of the `initialize` response and the input schemas of
//! the coaching tools, so `tools/list` never hand-writes JSON.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::constants::{json_fields, limits, tools};

/// Server Information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP Tool Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonSchema,
}

/// JSON Schema Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// JSON Schema Property Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

impl PropertySchema {
    fn new(property_type: &str, description: &str) -> Self {
        Self {
            property_type: property_type.to_string(),
            description: Some(description.to_string()),
            default: None,
            minimum: None,
            maximum: None,
            allowed: None,
        }
    }

    fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn with_range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    fn with_allowed(mut self, allowed: &[&str]) -> Self {
        self.allowed = Some(allowed.iter().map(|s| s.to_string()).collect());
        self
    }
}

/// Advertised capabilities. Tools are listed through `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: Value,
}

/// Complete MCP Initialize Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    pub capabilities: ServerCapabilities,
}

impl InitializeResponse {
    pub fn new(protocol_version: String, server_name: String, server_version: String) -> Self {
        Self {
            protocol_version,
            server_info: ServerInfo {
                name: server_name,
                version: server_version,
            },
            capabilities: ServerCapabilities {
                tools: json!({ "listChanged": false }),
            },
        }
    }
}

/// `tools/list` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResponse {
    pub tools: Vec<ToolSchema>,
}

impl ToolsListResponse {
    pub fn new() -> Self {
        Self {
            tools: create_coaching_tools(),
        }
    }
}

impl Default for ToolsListResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// All tool schemas, in the order they are listed
pub fn create_coaching_tools() -> Vec<ToolSchema> {
    vec![
        create_get_user_stats_tool(),
        create_get_last_runs_tool(),
        create_itinerary_tool(),
        create_segment_itinerary_tool(),
        create_weather_prediction_tool(),
        create_activity_series_tool(),
    ]
}

fn object_schema(properties: HashMap<String, PropertySchema>, required: &[&str]) -> JsonSchema {
    JsonSchema {
        schema_type: "object".to_string(),
        properties: Some(properties),
        required: if required.is_empty() {
            None
        } else {
            Some(required.iter().map(|s| s.to_string()).collect())
        },
    }
}

fn itinerary_properties() -> HashMap<String, PropertySchema> {
    let mut properties = HashMap::new();
    properties.insert(
        json_fields::STARTING_PLACE.to_string(),
        PropertySchema::new("string", "Place name or address where the loop starts and ends")
            .with_default(json!("Opéra, Paris")),
    );
    properties.insert(
        json_fields::DISTANCE_KM.to_string(),
        PropertySchema::new(
            "number",
            "Target loop length in kilometers; shorter requests are planned as 3 km",
        )
        .with_default(json!(10))
        .with_maximum(limits::MAX_ITINERARY_KM),
    );
    properties
}

fn create_get_user_stats_tool() -> ToolSchema {
    ToolSchema {
        name: tools::GET_USER_STATS.to_string(),
        description: "Get the athlete's running totals: recent, year-to-date and all-time".to_string(),
        input_schema: object_schema(HashMap::new(), &[]),
    }
}

fn create_get_last_runs_tool() -> ToolSchema {
    let mut properties = HashMap::new();
    properties.insert(
        json_fields::LIMIT.to_string(),
        PropertySchema::new("integer", "Number of recent activities to inspect")
            .with_default(json!(limits::DEFAULT_LAST_RUNS_LIMIT))
            .with_range(1.0, limits::MAX_ACTIVITIES_FETCH as f64),
    );

    ToolSchema {
        name: tools::GET_LAST_RUNS.to_string(),
        description: "Get the athlete's most recent runs with distance, pace, speed, heart rate and elevation".to_string(),
        input_schema: object_schema(properties, &[]),
    }
}

fn create_itinerary_tool() -> ToolSchema {
    ToolSchema {
        name: tools::CREATE_ITINERARY.to_string(),
        description: "Create a circular running itinerary of the requested distance and return a Google Maps link".to_string(),
        input_schema: object_schema(itinerary_properties(), &[]),
    }
}

fn create_segment_itinerary_tool() -> ToolSchema {
    ToolSchema {
        name: tools::CREATE_SEGMENT_ITINERARY.to_string(),
        description: "Create a running loop of the requested distance that goes through a popular Strava segment".to_string(),
        input_schema: object_schema(itinerary_properties(), &[]),
    }
}

fn create_weather_prediction_tool() -> ToolSchema {
    let mut properties = HashMap::new();
    properties.insert(
        json_fields::PLACE_NAME.to_string(),
        PropertySchema::new(
            "string",
            "Place to forecast; defaults to the athlete's usual running area",
        ),
    );

    ToolSchema {
        name: tools::GET_WEATHER_PREDICTION.to_string(),
        description: "Get the 5-day / 3-hour weather forecast for a place or for the athlete's usual running area".to_string(),
        input_schema: object_schema(properties, &[]),
    }
}

fn create_activity_series_tool() -> ToolSchema {
    let mut properties = HashMap::new();
    properties.insert(
        json_fields::NUMBER_OF_ACTIVITY.to_string(),
        PropertySchema::new("integer", "Number of recent activities to process").with_range(1.0, 20.0),
    );
    properties.insert(
        json_fields::RESOLUTION.to_string(),
        PropertySchema::new("string", "Stream resolution requested from Strava")
            .with_default(json!("high"))
            .with_allowed(&["low", "medium", "high"]),
    );
    properties.insert(
        json_fields::SERIES_TYPE.to_string(),
        PropertySchema::new("string", "Base series used by Strava for downsampling")
            .with_default(json!("time"))
            .with_allowed(&["time", "distance"]),
    );
    properties.insert(
        json_fields::SLICE_STEP.to_string(),
        PropertySchema::new(
            "integer",
            "Keep every n-th raw sample instead of resampling to 1 Hz",
        )
        .with_range(1.0, 1000.0),
    );

    ToolSchema {
        name: tools::GET_ACTIVITY_SERIES.to_string(),
        description: "Get cleaned heart-rate and speed time series for the athlete's last activities".to_string(),
        input_schema: object_schema(properties, &[json_fields::NUMBER_OF_ACTIVITY]),
    }
}

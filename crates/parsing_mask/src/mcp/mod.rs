use crate::{
    groups::LabelGroup,
    labels::{Label, palette_color},
    service::{GenerateMaskRequest, GenerateMaskResponse, MaskService},
};
use rmcp::{
    handler::server::tool::IntoCallToolResult,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, Error as McpError, ServerHandler,
};
use serde::Serialize;
use strum::IntoEnumIterator;
use ts_rs::TS;
use std::sync::Arc;

/// Response of the `generate_mask` tool
#[derive(Debug, Serialize, schemars::JsonSchema, TS)]
#[ts(export)]
pub struct MaskToolResponse {
    #[schemars(description = "Base64-encoded PNG mask (grayscale)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_png_base64: Option<String>,
    #[schemars(description = "Mask dimensions")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<MaskDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, schemars::JsonSchema, TS)]
pub struct MaskDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
struct LabelInfo {
    id: u8,
    name: &'static str,
    color: [u8; 3],
}

#[derive(Debug, Serialize)]
struct GroupInfo {
    name: &'static str,
    labels: Vec<u32>,
}

impl MaskToolResponse {
    fn error(message: String) -> Self {
        Self { mask_png_base64: None, dimensions: None, error: Some(message) }
    }
}

impl From<GenerateMaskResponse> for MaskToolResponse {
    fn from(response: GenerateMaskResponse) -> Self {
        Self {
            mask_png_base64: Some(response.mask_png_base64),
            dimensions: Some(MaskDimensions { width: response.width, height: response.height }),
            error: None,
        }
    }
}

impl IntoCallToolResult for MaskToolResponse {
    fn into_call_tool_result(self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&self).unwrap_or_else(|_| format!("{:?}", self)),
        )]))
    }
}

/// MCP Server for parsing-map inpainting masks
#[derive(Clone)]
pub struct ParsingMaskMcpServer {
    service: Arc<MaskService>,
}

impl ParsingMaskMcpServer {
    pub fn new() -> Self {
        Self::with_service(MaskService::new())
    }

    pub fn with_service(service: MaskService) -> Self {
        Self { service: Arc::new(service) }
    }
}

impl Default for ParsingMaskMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool(tool_box)]
impl ParsingMaskMcpServer {
    #[tool(description = "Generate a soft inpainting mask from a base64 PNG human-parsing map")]
    fn generate_mask(&self, #[tool(aggr)] request: GenerateMaskRequest) -> MaskToolResponse {
        match self.service.handle(&request) {
            Ok(response) => response.into(),
            Err(e) => {
                tracing::warn!("mask generation rejected: {}", e);
                MaskToolResponse::error(e.to_string())
            }
        }
    }

    #[tool(description = "List the parsing label ids, names and palette colours")]
    fn list_labels(&self) -> String {
        let labels: Vec<LabelInfo> = Label::iter()
            .map(|label| LabelInfo {
                id: label.id(),
                name: label.into(),
                color: palette_color(label.id()),
            })
            .collect();
        serde_json::to_string_pretty(&labels)
            .unwrap_or_else(|e| format!("Failed to serialize labels: {}", e))
    }

    #[tool(description = "List the label groups usable as target_groups / protect_groups")]
    fn list_groups(&self) -> String {
        let groups: Vec<GroupInfo> = LabelGroup::iter()
            .map(|group| GroupInfo {
                name: group.into(),
                labels: group.labels().iter().collect(),
            })
            .collect();
        serde_json::to_string_pretty(&groups)
            .unwrap_or_else(|e| format!("Failed to serialize groups: {}", e))
    }

    #[tool(description = "Get the JSON schema of the generate_mask request")]
    fn get_request_schema(&self) -> String {
        let schema = schemars::schema_for!(GenerateMaskRequest);
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|e| format!("Failed to serialize schema: {}", e))
    }
}

#[tool(tool_box)]
impl ServerHandler for ParsingMaskMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Parsing Mask Server - turn a human-parsing label map into a soft inpainting mask. Select what to inpaint with target_labels or target_groups (clothing, body, head) and what to keep with protect_labels / protect_groups.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_only_carries_the_message() {
        let json = serde_json::to_value(MaskToolResponse::error("Unknown group: shoes".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Unknown group: shoes" }));
    }

    #[test]
    fn test_generate_mask_reports_errors() {
        let server = ParsingMaskMcpServer::new();
        let response = server.generate_mask(GenerateMaskRequest::default());
        assert!(response.mask_png_base64.is_none());
        assert!(response.error.is_some());
    }

    #[test]
    fn test_list_labels_and_groups() {
        let server = ParsingMaskMcpServer::new();
        let labels: serde_json::Value = serde_json::from_str(&server.list_labels()).unwrap();
        assert_eq!(labels.as_array().unwrap().len(), 18);
        assert_eq!(labels[4]["name"], "upper-clothes");

        let groups: serde_json::Value = serde_json::from_str(&server.list_groups()).unwrap();
        assert_eq!(groups[0]["name"], "clothing");
        assert_eq!(groups[0]["labels"], serde_json::json!([4, 5, 6, 7, 8, 16, 17]));
    }

    #[test]
    fn test_request_schema_lists_fields() {
        let schema = ParsingMaskMcpServer::new().get_request_schema();
        assert!(schema.contains("parsing_png_base64"));
        assert!(schema.contains("protect_groups"));
    }
}

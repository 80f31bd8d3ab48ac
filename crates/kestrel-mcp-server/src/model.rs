//! Registry model: resources, templates, tools and content items

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A static resource descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            mime_type: None,
            description: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A templated resource descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceTemplate {
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            mime_type: None,
            description: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One declared tool argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    /// JSON Schema type name (`string`, `number`, `integer`, `boolean`, ...)
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
}

impl ToolParam {
    pub fn new(name: impl Into<String>, param_type: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: None,
            required,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A tool descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<ToolParam>,
}

impl Tool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }

    /// Object schema derived from the declared params
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(param.param_type.clone()));
            if let Some(description) = &param.description {
                prop.insert("description".into(), Value::String(description.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Descriptor as listed by `list_tools`
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), Value::String(self.name.clone()));
        if let Some(description) = &self.description {
            obj.insert("description".into(), Value::String(description.clone()));
        }
        obj.insert("inputSchema".into(), self.input_schema());
        Value::Object(obj)
    }
}

/// A piece of resource or tool output; always carries a MIME type
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text { mime_type: String, text: String },
    Json { mime_type: String, value: Value },
    Binary { mime_type: String, data: Vec<u8> },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            mime_type: "text/plain".to_string(),
            text: text.into(),
        }
    }

    pub fn text_with_mime(mime_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            mime_type: mime_type.into(),
            text: text.into(),
        }
    }

    pub fn json(value: Value) -> Self {
        Self::Json {
            mime_type: "application/json".to_string(),
            value,
        }
    }

    pub fn binary(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Binary {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            ContentItem::Text { mime_type, .. }
            | ContentItem::Json { mime_type, .. }
            | ContentItem::Binary { mime_type, .. } => mime_type,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentItem::Text { .. })
    }

    /// Wire form; resource reads pass the URI the item was read from.
    pub fn to_json(&self, uri: Option<&str>) -> Value {
        let mut obj = Map::new();
        if let Some(uri) = uri {
            obj.insert("uri".into(), Value::String(uri.to_string()));
        }
        match self {
            ContentItem::Text { mime_type, text } => {
                obj.insert("type".into(), "text".into());
                obj.insert("mimeType".into(), Value::String(mime_type.clone()));
                obj.insert("text".into(), Value::String(text.clone()));
            }
            ContentItem::Json { mime_type, value } => {
                obj.insert("type".into(), "json".into());
                obj.insert("mimeType".into(), Value::String(mime_type.clone()));
                obj.insert("text".into(), Value::String(value.to_string()));
            }
            ContentItem::Binary { mime_type, data } => {
                obj.insert("type".into(), "binary".into());
                obj.insert("mimeType".into(), Value::String(mime_type.clone()));
                obj.insert("blob".into(), Value::String(BASE64.encode(data)));
            }
        }
        Value::Object(obj)
    }
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub content: Vec<ContentItem>,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: Vec<ContentItem>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![ContentItem::text(text)])
    }

    /// A tool-level failure reported inside a successful response
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: true,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "content": self.content.iter().map(|c| c.to_json(None)).collect::<Vec<_>>(),
            "isError": self.is_error,
        })
    }
}

use canonfill_core_types::OptionItem;
use serde::{Deserialize, Serialize};

/// What kind of control a locator resolved to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ElementKind {
    Text { input_type: String },
    TextArea,
    Select,
    Radio,
    Checkbox,
    /// Buttons and submit/button/image inputs; never written to.
    Action,
    Unsupported,
}

impl ElementKind {
    pub fn input_type_label(&self) -> &str {
        match self {
            ElementKind::Text { input_type } => input_type.as_str(),
            ElementKind::TextArea => "textarea",
            ElementKind::Select => "select",
            ElementKind::Radio => "radio",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Action => "button",
            ElementKind::Unsupported => "unsupported",
        }
    }
}

/// Raw tag/type probe of a DOM element.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementProbe {
    pub tag: String,
    pub input_type: Option<String>,
}

impl ElementProbe {
    pub fn kind(&self) -> ElementKind {
        match self.tag.as_str() {
            "button" => ElementKind::Action,
            "select" => ElementKind::Select,
            "textarea" => ElementKind::TextArea,
            "input" => {
                let input_type = self
                    .input_type
                    .as_deref()
                    .unwrap_or("text")
                    .to_lowercase();
                match input_type.as_str() {
                    "submit" | "button" | "image" => ElementKind::Action,
                    "radio" => ElementKind::Radio,
                    "checkbox" => ElementKind::Checkbox,
                    _ => ElementKind::Text { input_type },
                }
            }
            _ => ElementKind::Unsupported,
        }
    }
}

/// One interactive element as seen by the whole-form scan, used by the
/// completeness report.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScannedField {
    pub tag: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub label: String,
    pub required: bool,
    pub value: String,
    #[serde(default)]
    pub checked: Option<bool>,
}

impl ScannedField {
    pub fn label_candidates(&self) -> Vec<&str> {
        [&self.label, &self.name, &self.id]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn is_filled(&self) -> bool {
        if self.input_type == "checkbox" {
            return self.checked.unwrap_or(false) || self.value == "checked";
        }
        !self.value.trim().is_empty()
    }
}

/// Type-aware details captured alongside a readback value.
#[derive(Clone, Debug, Default)]
pub struct ReadbackDetails {
    pub input_type: Option<String>,
    pub selected_option: Option<OptionItem>,
    pub checked: Option<bool>,
}

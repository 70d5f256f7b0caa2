use crate::identifiers::IdentifierRules;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_max_documents() -> usize {
    10
}

fn default_image_context() -> String {
    "Wound image provided. AI should consider wound size, shape, and appearance.".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Audit framework: citations, checklist and required output sections
    #[serde(default)]
    pub framework: AuditFramework,
    /// Label tables used by the identifier extractor
    #[serde(default)]
    pub identifiers: IdentifierRules,
    /// Upper bound on documents per run; more is a rejected input
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    /// What to do when one document fails extraction
    #[serde(default)]
    pub document_policy: DocumentPolicy,
    /// Annotation sent to the service when a wound image is attached
    #[serde(default = "default_image_context")]
    pub image_context: String,
    /// Put the computed trajectory/risk summary ahead of the note text in the request
    #[serde(default = "default_true")]
    pub include_metrics_in_request: bool,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPolicy {
    /// Any extraction failure aborts the run
    #[default]
    Abort,
    /// Failed documents are reported and skipped; the run needs at least one survivor
    SkipFailed,
}

/// Audit framework configuration. Citation and section content is opaque
/// deployment data; the composer only arranges it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditFramework {
    pub name: String,
    /// Report title, also used as the PDF document title
    pub title: String,
    /// Coverage-determination references (e.g. "L35125")
    pub citations: Vec<String>,
    /// What the reviewer should check for, in prompt order
    pub review_focus: Vec<String>,
    /// Checklist items the narrative must address
    #[serde(default)]
    pub checklist: Vec<String>,
    /// Required output sections, numbered in the prompt
    pub sections: Vec<String>,
    /// Ask for a visit-to-visit comparison across notes
    #[serde(default)]
    pub comparison_mode: bool,
}

impl AuditFramework {
    pub fn builtin_names() -> &'static [&'static str] {
        &["cms-lcd", "timers", "longitudinal"]
    }

    pub fn builtin(name: &str) -> Result<Self> {
        match name {
            "cms-lcd" => Ok(Self::cms_lcd()),
            "timers" => Ok(Self::timers()),
            "longitudinal" => Ok(Self::longitudinal()),
            other => Err(anyhow!(
                "Unknown audit framework '{}' (available: {})",
                other,
                Self::builtin_names().join(", ")
            )),
        }
    }

    fn cms_checklist() -> Vec<String> {
        vec![
            "Location, size, depth, undermining/tunneling documented?".to_string(),
            "Drainage type and amount?".to_string(),
            "Conservative care documented for >= 30 days?".to_string(),
            "ICD-10 and CPT codes accurate and match wound type?".to_string(),
            "Plan of care includes vascular and nutrition assessment?".to_string(),
            "Wound showing measurable signs of healing?".to_string(),
            "Skin substitute justification present?".to_string(),
            "Debridement code type supported (selective/non-selective/surgical)?".to_string(),
            "Granulation tissue or surface dimension improvement?".to_string(),
        ]
    }

    /// LCD L35125 (Novitas) + L38902 (Noridian), four output sections
    fn cms_lcd() -> Self {
        Self {
            name: "cms-lcd".to_string(),
            title: "CMS Wound Audit Report (L35125 / L38902)".to_string(),
            citations: vec!["L35125".to_string(), "L38902".to_string()],
            review_focus: vec![
                "medical necessity".to_string(),
                "healing progression".to_string(),
                "conservative care".to_string(),
                "proper CPT/ICD use".to_string(),
                "vascular/nutritional status".to_string(),
                "wound progression".to_string(),
            ],
            checklist: Self::cms_checklist(),
            sections: vec![
                "Audit Summary".to_string(),
                "Recommendations".to_string(),
                "Corrected Note".to_string(),
                "Compliance Rating".to_string(),
            ],
            comparison_mode: false,
        }
    }

    /// TIMERS-structured wound assessment review
    fn timers() -> Self {
        Self {
            name: "timers".to_string(),
            title: "TIMERS Wound Documentation Audit".to_string(),
            citations: vec!["L35125".to_string(), "L38902".to_string()],
            review_focus: vec![
                "tissue type".to_string(),
                "infection/inflammation".to_string(),
                "moisture balance".to_string(),
                "wound edge".to_string(),
                "regeneration/repair".to_string(),
                "social and patient-related factors".to_string(),
            ],
            checklist: Self::cms_checklist(),
            sections: vec![
                "Audit Summary".to_string(),
                "TIMERS Assessment".to_string(),
                "Missing Elements".to_string(),
                "Recommendations".to_string(),
                "Corrected Note".to_string(),
                "Compliance Rating".to_string(),
            ],
            comparison_mode: false,
        }
    }

    /// Multi-visit review comparing consecutive notes
    fn longitudinal() -> Self {
        Self {
            name: "longitudinal".to_string(),
            title: "Longitudinal Wound Care Audit".to_string(),
            citations: vec!["L35125".to_string(), "L38902".to_string()],
            review_focus: vec![
                "medical necessity".to_string(),
                "healing progression across visits".to_string(),
                "consistency of measurements between notes".to_string(),
                "conservative care duration".to_string(),
                "proper CPT/ICD use".to_string(),
            ],
            checklist: Self::cms_checklist(),
            sections: vec![
                "Audit Summary".to_string(),
                "Visit-to-Visit Comparison".to_string(),
                "Recommendations".to_string(),
                "Compliance Rating".to_string(),
            ],
            comparison_mode: true,
        }
    }
}

impl Default for AuditFramework {
    fn default() -> Self {
        Self::cms_lcd()
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Connection settings for the chat-completions service. The credential
/// itself is never stored here, only the variable it is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_page_width_mm() -> f32 {
    210.0
}

fn default_page_height_mm() -> f32 {
    297.0
}

fn default_margin_mm() -> f32 {
    15.0
}

fn default_font_size() -> f32 {
    11.0
}

fn default_line_height_mm() -> f32 {
    7.0
}

fn default_wrap_width() -> usize {
    90
}

fn default_placeholder() -> char {
    '?'
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_page_width_mm")]
    pub page_width_mm: f32,
    #[serde(default = "default_page_height_mm")]
    pub page_height_mm: f32,
    #[serde(default = "default_margin_mm")]
    pub margin_left_mm: f32,
    #[serde(default = "default_margin_mm")]
    pub margin_top_mm: f32,
    /// Auto page break happens once the cursor would cross this margin
    #[serde(default = "default_margin_mm")]
    pub margin_bottom_mm: f32,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_line_height_mm")]
    pub line_height_mm: f32,
    /// Characters per rendered line before word wrapping
    #[serde(default = "default_wrap_width")]
    pub wrap_width: usize,
    /// Replacement for characters outside the output character set
    #[serde(default = "default_placeholder")]
    pub placeholder: char,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_width_mm: default_page_width_mm(),
            page_height_mm: default_page_height_mm(),
            margin_left_mm: default_margin_mm(),
            margin_top_mm: default_margin_mm(),
            margin_bottom_mm: default_margin_mm(),
            font_size: default_font_size(),
            line_height_mm: default_line_height_mm(),
            wrap_width: default_wrap_width(),
            placeholder: default_placeholder(),
        }
    }
}

impl AuditConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {path}"))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AuditConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the given config file, or fall back to defaults when no path is
    /// given. A named file that is missing or invalid is an error.
    pub fn load_with_fallback(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => {
                tracing::debug!("no config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Swap in one of the built-in frameworks by name
    pub fn with_framework(mut self, name: &str) -> Result<Self> {
        self.framework = AuditFramework::builtin(name)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_documents == 0 {
            return Err(anyhow!("max_documents must be at least 1"));
        }
        if self.framework.sections.is_empty() {
            return Err(anyhow!(
                "framework '{}' must list at least one output section",
                self.framework.name
            ));
        }
        if self.render.wrap_width == 0 || self.render.line_height_mm <= 0.0 {
            return Err(anyhow!("render wrap_width and line_height_mm must be positive"));
        }
        if !(' '..='~').contains(&self.render.placeholder) {
            return Err(anyhow!("render placeholder must be a printable ASCII character"));
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            framework: AuditFramework::default(),
            identifiers: IdentifierRules::default(),
            max_documents: default_max_documents(),
            document_policy: DocumentPolicy::default(),
            image_context: default_image_context(),
            include_metrics_in_request: true,
            service: ServiceConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

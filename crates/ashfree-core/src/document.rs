//! Uploaded documents: text extraction and structured analysis.

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, GenerationError};

pub trait DocumentExtractor: Send + Sync {
    /// Plain text of a document, chosen by file extension.
    fn extract(&self, bytes: &[u8], extension: &str) -> Result<String, ExtractionError>;
}

/// Handles `.txt`, `.md` and `.pdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl DocumentExtractor for DefaultExtractor {
    fn extract(&self, bytes: &[u8], extension: &str) -> Result<String, ExtractionError> {
        let extension = extension.trim_start_matches('.').to_lowercase();
        if !matches!(extension.as_str(), "txt" | "text" | "md" | "markdown" | "pdf") {
            return Err(ExtractionError::UnsupportedFormat(extension));
        }
        if bytes.is_empty() {
            return Err(ExtractionError::Empty);
        }

        let text = if extension == "pdf" {
            extract_pdf(bytes)?
        } else {
            String::from_utf8(bytes.to_vec()).map_err(|_| ExtractionError::InvalidText)?
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text.to_string())
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(ExtractionError::Encrypted);
    }
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    tracing::debug!(pages = pages.len(), "extracting pdf text");
    doc.extract_text(&pages)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportantValue {
    pub label: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub summary: String,
    #[serde(alias = "medical_values")]
    pub important_values: Vec<ImportantValue>,
    pub keywords: Vec<String>,
    pub highlighted_points: Vec<String>,
}

const REQUIRED_KEYS: [&str; 4] = ["summary", "importantValues", "keywords", "highlightedPoints"];
const RAW_PREVIEW_CHARS: usize = 300;

impl DocumentAnalysis {
    fn failed(summary: String, point: &str) -> Self {
        Self {
            summary,
            important_values: Vec::new(),
            keywords: Vec::new(),
            highlighted_points: vec![point.to_string()],
        }
    }

    /// What a caller sees when the model answered but nothing parseable came back.
    pub fn unparseable(raw: &str) -> Self {
        let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
        Self::failed(
            format!(
                "Analysis failed: Could not extract structured response from AI model.\nRaw response starts with: {preview}..."
            ),
            "The full AI response was written to the server log.",
        )
    }

    pub fn generation_failed(error: &GenerationError) -> Self {
        match error {
            GenerationError::NotConfigured => Self {
                summary: "Analysis failed: AI model not available.".to_string(),
                important_values: Vec::new(),
                keywords: Vec::new(),
                highlighted_points: Vec::new(),
            },
            other => Self::failed(
                format!("An error occurred during analysis: {other}"),
                "Analysis could not be completed.",
            ),
        }
    }
}

pub fn analysis_prompt(document_text: &str) -> String {
    format!(
        r#"You are a highly accurate medical document analysis AI. Your task is to read the following medical document and extract specific information. Provide the output in a structured JSON format.

Document Text:

{document_text}

Analyze the document and provide the following:
1. A concise summary of the report (e.g., type of report, main findings).
2. Important medical values mentioned, especially related to specific conditions (like vitamin deficiencies, blood work, etc.). List them as a list of objects with 'label', 'value', and 'unit' (if available).
3. Key medical keywords or terms from the document.
4. Important points or conclusions as a list of short statements.

Your response MUST contain ONLY the JSON object with the EXACT keys: "summary", "importantValues", "keywords", and "highlightedPoints". Do not include any other text, markdown formatting, or explanations before or after the JSON. The output should start with '{{' and end with '}}'.

JSON Output:"#
    )
}

/// Parses a model reply into an analysis, repairing the usual damage:
/// code fences, prose around the object, trailing commas, truncation.
pub fn parse_analysis(raw: &str) -> Option<DocumentAnalysis> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let start = cleaned.find('{')?;
    let tail = &cleaned[start..];
    let bounded = cleaned
        .rfind('}')
        .filter(|&end| end > start)
        .map(|end| &cleaned[start..=end]);

    bounded
        .into_iter()
        .chain(std::iter::once(tail))
        .find_map(parse_candidate)
}

fn parse_candidate(candidate: &str) -> Option<DocumentAnalysis> {
    let repaired = strip_trailing_commas(&close_truncated(candidate));
    let mut value: serde_json::Value = serde_json::from_str(&repaired).ok()?;

    let object = value.as_object_mut()?;
    if !object.contains_key("importantValues") {
        if let Some(values) = object.remove("medical_values") {
            tracing::warn!("renamed medical_values to importantValues");
            object.insert("importantValues".to_string(), values);
        }
    }
    if !REQUIRED_KEYS.iter().all(|key| object.contains_key(*key)) {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Appends whatever closing quotes and brackets a cut-off JSON text is missing.
fn close_truncated(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = text.trim_end().to_string();
    if in_string {
        out.push('"');
    }
    while let Some(closer) = stack.pop() {
        let trimmed = out.trim_end().trim_end_matches(',').len();
        out.truncate(trimmed);
        // a dangling `"key":` cannot be closed meaningfully
        if out.ends_with(':') {
            out.push_str("null");
        }
        out.push(closer);
    }
    out
}

/// Drops commas that directly precede `}` or `]`, outside string literals.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Rendering of a prior analysis for the document question prompt.
pub fn analysis_context(analysis: &DocumentAnalysis) -> String {
    let mut out = format!("Summary: {}", analysis.summary.trim());
    if !analysis.important_values.is_empty() {
        out.push_str("\nImportant values:");
        for value in &analysis.important_values {
            let rendered = match &value.value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match value.unit.as_deref().filter(|u| !u.is_empty()) {
                Some(unit) => out.push_str(&format!("\n- {}: {rendered} {unit}", value.label)),
                None => out.push_str(&format!("\n- {}: {rendered}", value.label)),
            }
        }
    }
    if !analysis.highlighted_points.is_empty() {
        out.push_str("\nHighlighted points:");
        for point in &analysis.highlighted_points {
            out.push_str(&format!("\n- {point}"));
        }
    }
    out
}

use ashfree_schema::{ConversationMode, ConversationTurn, RetrievalResult, Sender, UserContext};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::context_format::{format_context, ContextStyle};

pub const MOTIVATIONAL_TIPS: &[&str] = &[
    "Remember: Most cravings last only 3-5 minutes. You can get through this!",
    "Every craving you resist is a victory. Be proud of yourself!",
    "Try the 4 D's: Delay, Deep breathing, Drink water, Do something else.",
    "You are stronger than your cravings. Take a deep breath and focus on your goal.",
    "Reward yourself for every smoke-free day. You deserve it!",
    "Reach out to a friend or support group when you need encouragement.",
    "Visualize your life as a non-smoker: more energy, better health, more freedom.",
    "If you slip, don't give up. Every attempt brings you closer to success.",
    "Drinking water and going for a short walk can help reduce cravings.",
    "You're saving money and improving your health every day you stay smoke-free!",
];

pub const CLOSING_FOLLOW_UP: &str =
    "Is there a specific situation or trigger you'd like more help with?";

const CHAT_FRAMING: &str = "You are a supportive, empathetic nicotine recovery coach. Your goal is to help people overcome cravings and stay smoke-free.";

const CHAT_INSTRUCTIONS: &str = "Respond in a warm, supportive, and conversational tone. Be empathetic and understanding.
If the user is experiencing a strong craving, provide immediate distraction techniques and remind them that cravings are temporary.
If the user is feeling discouraged, offer encouragement and remind them of their progress.
Provide evidence-based information when relevant and avoid judgment or criticism.
Suggest one actionable step the user can take right now. Ask a follow-up question to keep the conversation going.
Keep your response brief and focused on helping the user overcome their current challenge.";

const VOICE_FRAMING: &str = "You are a highly interactive, supportive, and empathetic nicotine recovery coach. Your primary goal is to engage the user in a helpful conversation to overcome cravings and stay smoke-free. Make the conversation feel natural and encouraging.";

const VOICE_INSTRUCTIONS: &str = "Based on the user's message, their context, and the recent chat history, generate ONLY the assistant's direct response. Do NOT include any introductory phrases, meta-commentary, or instructions to yourself. Respond in a warm, supportive, and conversational tone.

- Be empathetic and validate their feelings.
- Directly address their current situation, especially if they mention a craving or challenge.
- If appropriate, briefly offer a relevant piece of information from the knowledge base in a natural, conversational way.
- If necessary, suggest ONE concrete, actionable coping strategy they can try right now.
- Ask ONE open-ended, relevant follow-up question.
- Keep your response to 1-3 sentences unless the user asks for more information. It will be spoken aloud.
- Do not repeat the user's message or mention that you are using the history or context.
- Do not include any markdown or special formatting.
- Do not use emojis.";

const DOCUMENT_FRAMING: &str = "You are a helpful AI assistant that answers questions about the provided medical document. Use only the information from the document and the provided analysis context to answer.";

const DOCUMENT_INSTRUCTIONS: &str = "Based on the document text, the provided analysis context, and chat history, answer the user's question. If the answer is not in the document or the analysis context, state that you cannot find the information.";

const RESPONSE_CUE: &str = "Assistant Response:";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    /// `heading:` on its own line, body below.
    Block(&'static str),
    /// `label: body` on one line.
    Inline(&'static str),
    /// Body only.
    Plain,
}

#[derive(Debug, Clone)]
struct Section {
    name: &'static str,
    layout: Layout,
    body: String,
}

impl Section {
    fn render(&self) -> String {
        match self.layout {
            Layout::Block(heading) => format!("{heading}:\n{}", self.body),
            Layout::Inline(label) => format!("{label}: {}", self.body),
            Layout::Plain => self.body.clone(),
        }
    }
}

/// Ordered list of named prompt sections, rendered once at the end.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<Section>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'static str, body: impl Into<String>) -> Self {
        self.sections.push(Section {
            name,
            layout: Layout::Plain,
            body: body.into(),
        });
        self
    }

    pub fn block(
        mut self,
        name: &'static str,
        heading: &'static str,
        body: impl Into<String>,
    ) -> Self {
        self.sections.push(Section {
            name,
            layout: Layout::Block(heading),
            body: body.into(),
        });
        self
    }

    pub fn inline(
        mut self,
        name: &'static str,
        label: &'static str,
        body: impl Into<String>,
    ) -> Self {
        self.sections.push(Section {
            name,
            layout: Layout::Inline(label),
            body: body.into(),
        });
        self
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.body.as_str())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sections.iter().map(|s| s.name).collect()
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(Section::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A document the user is asking about.
#[derive(Debug, Clone, Copy)]
pub struct DocumentInput<'a> {
    pub text: &'a str,
    /// Rendered prior analysis, if the document was analyzed first.
    pub analysis_context: Option<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub mode: ConversationMode,
    pub context: &'a UserContext,
    pub message: &'a str,
    pub history: &'a [ConversationTurn],
    pub passages: &'a [RetrievalResult],
    pub document: Option<DocumentInput<'a>>,
}

fn speaker(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "User",
        Sender::Assistant => "Assistant",
    }
}

fn history_lines(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "(no previous messages)".to_string();
    }
    history
        .iter()
        .map(|turn| format!("{}: {}", speaker(turn.sender), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn knowledge_lines<R: Rng + ?Sized>(passages: &[RetrievalResult], rng: &mut R) -> String {
    if passages.is_empty() {
        return MOTIVATIONAL_TIPS
            .choose(rng)
            .copied()
            .unwrap_or(MOTIVATIONAL_TIPS[0])
            .to_string();
    }
    passages
        .iter()
        .map(|p| format!("- {} (Source: {})", p.text, p.source))
        .collect::<Vec<_>>()
        .join("\n")
}

fn fenced(body: String) -> String {
    format!("###\n{body}\n###")
}

pub fn build(inputs: &PromptInputs<'_>) -> PromptBuilder {
    build_with_rng(inputs, &mut rand::thread_rng())
}

pub fn build_with_rng<R: Rng + ?Sized>(inputs: &PromptInputs<'_>, rng: &mut R) -> PromptBuilder {
    match inputs.mode {
        ConversationMode::Chat => {
            let context = format_context(inputs.context, ContextStyle::Detailed);
            let context = if context.is_empty() {
                "- No additional context provided.".to_string()
            } else {
                context
            };
            PromptBuilder::new()
                .text("framing", CHAT_FRAMING)
                .block("context", "Context about the user", context)
                .block("history", "Recent chat history", history_lines(inputs.history))
                .block(
                    "knowledge",
                    "Relevant information from our knowledge base",
                    fenced(knowledge_lines(inputs.passages, rng)),
                )
                .inline("message", "User message", inputs.message)
                .text("instructions", CHAT_INSTRUCTIONS)
                .text("follow_up", CLOSING_FOLLOW_UP)
        }
        ConversationMode::Voice => PromptBuilder::new()
            .text("framing", VOICE_FRAMING)
            .block(
                "context",
                "Context about the user",
                format_context(inputs.context, ContextStyle::Summary),
            )
            .block("history", "Recent chat history", history_lines(inputs.history))
            .block(
                "knowledge",
                "Relevant information from our knowledge base",
                fenced(knowledge_lines(inputs.passages, rng)),
            )
            .inline("message", "User message", inputs.message)
            .text("instructions", VOICE_INSTRUCTIONS)
            .text("cue", RESPONSE_CUE),
        ConversationMode::DocumentQa => {
            let document = inputs.document.unwrap_or(DocumentInput {
                text: "",
                analysis_context: None,
            });
            let mut builder = PromptBuilder::new()
                .text("framing", DOCUMENT_FRAMING)
                .block("document", "Document Text", document.text);
            if let Some(analysis) = document.analysis_context.filter(|a| !a.trim().is_empty()) {
                builder = builder.block("analysis", "Analysis Context", analysis);
            }
            builder
                .block("history", "Chat History", history_lines(inputs.history))
                .inline("message", "User Question", inputs.message)
                .text("instructions", DOCUMENT_INSTRUCTIONS)
                .text("cue", RESPONSE_CUE)
        }
    }
}

/// The full prompt text for one exchange.
pub fn compose(inputs: &PromptInputs<'_>) -> String {
    build(inputs).render()
}

use std::sync::LazyLock;

use common::storage::vector::RetrievedMatch;
use common::utils::finance::is_financial_question;
use regex::Regex;

use crate::services::GenerationRequest;

/// System prompt for answers grounded in retrieved filings. Explicit values
/// only, structured format, no attribution across entity boundaries.
pub const GROUNDED_SYSTEM_PROMPT: &str = "You are a financial analysis assistant. You MUST follow these rules:

STRICT RULES FOR FINANCIAL QUESTIONS:
1. Only answer using EXPLICITLY STATED values from the retrieved documents.
2. If a value is not present in the documents, say \"Not available in the retrieved documents.\"
3. NEVER guess or calculate values not explicitly provided.
4. If financial data belongs to a SUBSIDIARY, do NOT attribute it to the parent company unless explicitly stated.

REQUIRED FORMAT FOR FINANCIAL ANSWERS:
For any question about revenue, income, or financial metrics, use this format:

Entity: [Exact legal entity name from the documents]
Statement: [Income Statement / Balance Sheet / Cash Flow / Other]
Fiscal Year: [Year from the documents]
Currency: [Currency code]
Unit: [millions/thousands/etc.]

[Metric Name]: [Value]
[Other Metrics as needed]

Source: [Document name from context]

ADDITIONAL RULES:
- Always include the YEAR when citing financial figures
- Always include the CURRENCY and UNIT
- If year or unit is unclear, state: \"Year/unit not clearly specified in the source document.\"

For non-financial questions, answer normally in clear paragraphs.
";

/// System prompt for answers produced without any retrieved context.
pub const GENERAL_KNOWLEDGE_SYSTEM_PROMPT: &str = "You are a helpful assistant with general knowledge about companies and finance.

IMPORTANT: You are answering from your training data, NOT from specific documents.

When providing financial information:
- State that this is based on general knowledge
- Use approximate or estimated language where appropriate
- Mention that figures may be outdated or approximate
- Do NOT cite specific document sources

Keep answers helpful but honest about the limitations of non-grounded responses.
";

/// Returned verbatim when context exists but fails validation; generation
/// is never invoked on that path.
pub const NO_ANSWER_MESSAGE: &str = "The requested information is not available in the stored documents \
for the requested scope. The sources listed below are the closest retrieved \
material; they do not cover the entity, period or metric the question asks \
about.";

/// Phrases in a generated answer that mean retrieval did not actually
/// surface the requested value. Such answers are never served as grounded.
static ANSWER_FAILURE_PHRASES: &[&str] = &[
    "not available",
    "not found",
    "not explicitly stated",
    "not provided in the document",
    "missing from the document",
    "missing in the retrieved documents",
    "the document does not provide",
    "not found in the context",
    "not mentioned in the document",
    "no information available",
    "cannot be determined from",
    "not specified in the",
    "does not contain",
    "not present in",
    "information is not",
    "data is not",
];

/// Broader than the figure-check vocabulary; gates the data quality notes
/// and the financial caution trailer.
static FINANCIAL_TOPIC_KEYWORDS: &[&str] = &[
    "revenue",
    "income",
    "profit",
    "loss",
    "earnings",
    "assets",
    "liabilities",
    "equity",
    "cash flow",
    "financial",
    "fiscal",
];

/// A grounded answer shorter than this is too thin to serve.
const MIN_GROUNDED_CHARS: usize = 50;

static FIGURES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+[,.]?\d*").unwrap());
static YEAR_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(FY\s*)?20\d{2}\b|\b19\d{2}\b").unwrap());
static CURRENCY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(USD|INR|EUR|GBP|JPY)\b").unwrap());
static UNIT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(million|billion|thousand|crore|lakh)\b").unwrap());
static CURRENCY_SYMBOL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[$\u{20B9}\u{20AC}\u{00A3}]").unwrap());

/// Prompt for the grounded path: the question plus the retrieved documents,
/// each prefixed with its metadata, at temperature zero.
pub fn grounded_request(question: &str, matches: &[RetrievedMatch]) -> GenerationRequest {
    let mut blocks = Vec::with_capacity(matches.len());
    for (index, candidate) in matches.iter().enumerate() {
        let mut header = String::new();
        if let Some(entity) = &candidate.metadata.entity {
            header.push_str(&format!("Company: {entity}\n"));
        }
        if let Some(period) = &candidate.metadata.fiscal_period {
            header.push_str(&format!("Fiscal Year: {period}\n"));
        }
        header.push_str(&format!("Source: {}\n", candidate.metadata.origin));

        blocks.push(format!(
            "--- Document {number} ---\n{header}\nContent:\n{text}\n",
            number = index + 1,
            text = candidate.text,
        ));
    }
    let context = blocks.join("\n");

    GenerationRequest {
        system_prompt: GROUNDED_SYSTEM_PROMPT.to_string(),
        user_message: format!(
            "Question: {question}\n\nRetrieved Documents:\n{context}\n\nRemember: For financial questions, use the structured format. Include entity, year, currency, and unit."
        ),
        temperature: 0.0,
    }
}

/// Prompt for the fallback path: the question alone, answered from model
/// knowledge at a mildly creative temperature.
pub fn fallback_request(question: &str) -> GenerationRequest {
    GenerationRequest {
        system_prompt: GENERAL_KNOWLEDGE_SYSTEM_PROMPT.to_string(),
        user_message: format!(
            "Question: {question}\n\nNOTE: The requested information was NOT found in the stored documents.\nPlease answer based on your general training knowledge.\nBe clear that this is general knowledge, not from specific documents."
        ),
        temperature: 0.3,
    }
}

/// Why a grounded answer cannot be served, if any reason applies.
///
/// Checks for scripted failure phrases, for answers too short to carry
/// content, and for financial questions answered without a single figure.
pub fn grounded_answer_defect(answer: &str, question: &str) -> Option<String> {
    let lowered = answer.to_lowercase();
    if let Some(phrase) = ANSWER_FAILURE_PHRASES
        .iter()
        .find(|phrase| lowered.contains(**phrase))
    {
        return Some(format!("answer contains '{phrase}'"));
    }

    // Separator and bullet lines carry no content.
    let content = answer
        .lines()
        .filter(|line| {
            !line.trim().is_empty() && !line.starts_with('-') && !line.starts_with('=')
        })
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    if content.chars().count() < MIN_GROUNDED_CHARS {
        return Some("answer too short to be useful".to_string());
    }

    if is_financial_question(question) && !FIGURES.is_match(answer) {
        return Some("financial question but no figures in the answer".to_string());
    }

    None
}

/// Appends deterministic data quality notes when a financial answer lacks a
/// year or a currency/unit mention.
pub fn append_quality_notes(answer: String, question: &str) -> String {
    if !mentions_financial_topic(question) {
        return answer;
    }

    let mut notes = Vec::new();
    if !YEAR_MENTION.is_match(&answer) {
        notes.push("Year not clearly specified in the response.");
    }
    let has_unit = CURRENCY_CODE.is_match(&answer)
        || UNIT_WORD.is_match(&answer)
        || CURRENCY_SYMBOL.is_match(&answer);
    if !has_unit {
        notes.push("Currency/unit not clearly specified in the response.");
    }

    if notes.is_empty() {
        return answer;
    }

    let mut annotated = answer;
    annotated.push_str("\n\n---\nDATA QUALITY NOTES:\n");
    annotated.push_str(
        &notes
            .iter()
            .map(|note| format!("- {note}"))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    annotated
}

/// Frames a fallback answer so nobody mistakes it for a grounded one:
/// banner, disclaimer, and a caution trailer for financial questions.
pub fn wrap_llm_answer(answer: &str, question: &str) -> String {
    let banner = "=".repeat(60);
    let rule = "-".repeat(60);

    let mut formatted = format!(
        "{banner}\nAnswer Type: LLM Pretrained Knowledge (Not Document-Grounded)\n{banner}\n\n{answer}\n\n{rule}\nDISCLAIMER:\nThis answer is based on the model's general training data\nand NOT on the ingested document collection.\n"
    );

    if mentions_financial_topic(question) {
        formatted.push_str(
            "\nFINANCIAL NOTE:\n- Values may be approximate or outdated\n- Verify with official financial reports before making decisions\n- This is NOT auditable financial data\n",
        );
    }

    formatted.push_str(&rule);
    formatted
}

fn mentions_financial_topic(text: &str) -> bool {
    let lowered = text.to_lowercase();

    FINANCIAL_TOPIC_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

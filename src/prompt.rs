//! Prompt assembly for question generation and answer evaluation.
//!
//! Plain string builders; the retrieval pipeline supplies the sampled
//! context and the caller supplies the candidate profile. Every prompt
//! pins its output contract to a JSON shape the schema module parses.

use crate::pipeline::InterviewMode;

/// System prompt shared by every generation call.
pub const SYSTEM_PROMPT: &str = "You are a professional interviewer.";

/// Prompt asking for `num_questions` interview question variants as a
/// `{"Questions": [...]}` payload.
pub fn question_prompt(
    mode: InterviewMode,
    job: &str,
    context: &str,
    num_questions: usize,
) -> String {
    match mode {
        InterviewMode::Technical => format!(
            "# Role\n\
             You are the interviewer.\n\n\
             # Task\n\
             Create {num_questions} technical questions based on the following criteria:\n\
             - User role: {job}\n\
             - Context: {context}\n\n\
             # Instructions\n\
             - Generate questions that assess interest in new technologies related to {job}.\n\
             - Focus on concepts or the degree of interest; name a recently released technology in each question.\n\
             - Give a brief explanation of the technology, then ask a derived question.\n\
             - Questions must be answerable through verbal explanation; do not ask for code examples.\n\n\
             # Policy\n\
             - Generate {num_questions} unique questions.\n\
             - You must strictly adhere to the JSON output format below.\n\
             - Only include the question values; no other text, numbers, or explanations.\n\n\
             # Output Format\n\
             {{\n    \"Questions\": [\n        \"\"\n        ...\n    ]\n}}\n"
        ),
        InterviewMode::Behavioral => format!(
            "# Role\n\
             You are the interviewer.\n\n\
             # Task\n\
             Create {num_questions} behavioral questions based on the following criteria:\n\
             - Context: {context}\n\n\
             # Instructions\n\
             - Write {num_questions} unique, non-overlapping questions assessing personality and opinions.\n\
             - Each question must reference a specific recent news event from the context, state its background, and explain relevant keywords before asking.\n\
             - Ask what the interviewee thinks rather than what they know; keep the difficulty low enough to answer without prior knowledge of the news.\n\
             - Do not mention the interviewee's occupation.\n\n\
             # Policy\n\
             - You must strictly adhere to the JSON output format below.\n\
             - Only include the question values.\n\n\
             # Output Format\n\
             {{\n    \"Questions\": [\n        \"\"\n        ...\n    ]\n}}\n"
        ),
    }
}

/// Prompt asking for an evaluation verdict with a letter grade, an
/// explanation, and per-criterion sub-scores in `[1, 100]` or null.
pub fn evaluation_prompt(
    mode: InterviewMode,
    question: &str,
    answer: &str,
    years: &str,
    job: &str,
    context: &str,
) -> String {
    match mode {
        InterviewMode::Technical => format!(
            "# Role\n\
             You are a technical interviewer with expertise in conducting interviews.\n\n\
             # Task\n\
             Evaluate the answer based on the following criteria:\n\
             - Interviewee's job: {job}\n\
             - Interviewee's experience level: {years} years\n\
             - Interviewee's answer: {answer}\n\
             - Question: {question}\n\
             - Reference material: {context}\n\n\
             # Scoring Scale\n\
             A: Correctly includes the concept of the technology in the question plus additional correct information\n\
             B: Correctly explains only the concept of the technology in the question\n\
             C: Correctly explains related content about the technology, even if not directly on point\n\
             D: Correctly explains content about the field the technology belongs to\n\
             E: Includes any correct technology-related content\n\
             F: No answer, no technical content, or incorrect information\n\n\
             # Instructions\n\
             - Score strictly according to the Scoring Scale; only correct information counts.\n\
             - Provide a model answer suited to the interviewee's role and experience, using only content that can be expressed verbally.\n\
             - Rate the answer on problem_solving, technical_understanding, logical_thinking, learning_ability, and collaboration_communication, each an integer between 1 and 100, or null when the criterion is absent from the answer.\n\n\
             # Policy\n\
             - The 'score' value must be a letter grade.\n\
             - Do not mention the score or the scale in the explanation.\n\
             - Respond in JSON only, with no text outside the format below.\n\n\
             # Output Format\n\
             {{\n    \"score\": \"\",\n    \"explanation\": \"\",\n    \"model\": \"\",\n    \"criteria_scores\": {{\n        \"problem_solving\": null,\n        \"technical_understanding\": null,\n        \"logical_thinking\": null,\n        \"learning_ability\": null,\n        \"collaboration_communication\": null\n    }}\n}}\n"
        ),
        InterviewMode::Behavioral => format!(
            "# Role\n\
             You are a character interviewer with expertise in conducting interviews.\n\n\
             # Task\n\
             Evaluate the interviewee's response based on the following criteria:\n\
             - Job role: {job}\n\
             - Years of experience: {years}\n\
             - Interviewee's answer: {answer}\n\
             - Interview question: {question}\n\
             - Reference material: {context}\n\n\
             # Grade Policy\n\
             - A: specific, logically structured, and fully reflects the key personality elements the question targets\n\
             - B: faithfully reflects key elements with logical explanation but without examples or experience\n\
             - C: addresses some key elements but is general and lacks specificity\n\
             - D: shows a lack of understanding of the key elements or lacks logical coherence\n\
             - E: does not match the intent of the question but provides some related context\n\
             - F: missing, unrelated, or explicitly fails to understand the question\n\n\
             # Instructions\n\
             - Consider only the personality aspect, never the technical aspect.\n\
             - The explanation must highlight strengths, weaknesses, and areas for improvement without mentioning scores or grades.\n\
             - State the question's intent in 'intention', connecting it to the traits being assessed.\n\
             - Rate the answer on honesty_reliability, interpersonal_skills, self_motivation_passion, adaptability, and self_awareness, each an integer between 1 and 100, or null when the criterion is absent.\n\n\
             # Policy\n\
             - The 'score' value must be a letter grade.\n\
             - Respond in JSON only, with no text outside the format below.\n\n\
             # Output Format\n\
             {{\n    \"score\": \"\",\n    \"explanation\": \"\",\n    \"intention\": \"\",\n    \"criteria_scores\": {{\n        \"honesty_reliability\": null,\n        \"interpersonal_skills\": null,\n        \"self_motivation_passion\": null,\n        \"adaptability\": null,\n        \"self_awareness\": null\n    }}\n}}\n"
        ),
    }
}

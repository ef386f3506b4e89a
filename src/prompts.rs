//! Prompts for the two LLM calls of the workflow.
//!
//! Both prompts live here so tests (and stub backends) can rebuild the exact
//! request text without a live model.

/// System message for the question-extraction call.
pub const EXTRACT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that processes text to extract questions.";

/// System message for each solve call.
pub const SOLVE_SYSTEM_PROMPT: &str =
    "You are a physics expert providing detailed solutions in LaTeX format.";

/// Build the user message asking the model to list every question in `text`.
///
/// The model is expected to answer with one question per line.
pub fn extract_prompt(text: &str) -> String {
    format!(
        "The following text contains a physics assignment. \
Extract each individual question clearly and concisely:\n\n\
{text}\n\n\
List the questions one by one."
    )
}

/// Build the user message asking for a LaTeX solution to one `problem`.
pub fn solve_prompt(problem: &str) -> String {
    format!(
        "Solve the following physics problem and provide a detailed solution in LaTeX format.\n\
The solution should include the necessary formulas, steps, and final answer, \
all written clearly in LaTeX.\n\n\
Problem:\n\
{problem}\n\n\
Ensure that the solution is concise and avoids generating multiple variations."
    )
}

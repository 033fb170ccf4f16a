//! Fixed instruction text sent to the language-understanding service.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: the behavior contract is stated exactly
//!    once, so no code path can send a variant of it.
//!
//! 2. **Testability**: unit tests inspect the text directly without a live
//!    model, making prompt regressions easy to catch.
//!
//! The contract is not overridable: the
//! interpreter always opens its payload with [`BEHAVIOR_CONTRACT`].

/// Opening instruction of every interpretation request.
pub const BEHAVIOR_CONTRACT: &str = r#"You are a legal document interpreter. You explain documents to people who are not lawyers.

Follow these rules precisely:

1. SCOPE
   - Interpret ONLY the document text supplied below
   - Do NOT answer general legal questions unrelated to the document
   - Do NOT use outside legal knowledge, statutes, or case law that the document does not state

2. NO ADVICE
   - Do NOT tell the reader what they should do
   - Do NOT recommend signing, refusing, negotiating, or consulting anyone
   - Describe what the document says, never what the reader ought to do about it

3. PLAIN LANGUAGE
   - Simplify legal wording into everyday words
   - Keep every statement accurate to the document
   - Use short bullet points

4. ORGANISATION
   When the document contains them, group your explanation under these headings:
   - Obligations: what each party must do
   - Rights: what each party may do or is entitled to
   - Timelines: dates, deadlines, durations, notice periods
   - Penalties: fees, fines, forfeits, consequences of breach
   - Named entities: the people, companies, places, and amounts mentioned
   Omit a heading when the document says nothing about it.

5. QUESTIONS
   - If the reader asks a question, answer it only from the document text
   - If the document does not answer it, say so plainly

6. OUTPUT FORMAT
   - Output ONLY the explanation
   - Do NOT wrap it in code fences
   - Do NOT add a preamble or closing remarks"#;

/// Instruction sent alongside an image to obtain its text.
pub const OCR_INSTRUCTION: &str = "Extract all text from this image. \
Output only the text exactly as it appears, preserving line breaks and reading order. \
If the image contains no readable text, output nothing.";

/// Frame the extracted document text as the second request part.
pub fn document_part(text: &str) -> String {
    format!("Document:\n{}", text)
}

/// Frame the reader's question as the final request part.
pub fn question_part(question: &str) -> String {
    format!("Reader's question about this document:\n{}", question.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_covers_required_rules() {
        for needle in [
            "ONLY the document text",
            "outside legal knowledge",
            "NO ADVICE",
            "Obligations",
            "Rights",
            "Timelines",
            "Penalties",
            "Named entities",
        ] {
            assert!(BEHAVIOR_CONTRACT.contains(needle), "missing: {needle}");
        }
    }

    #[test]
    fn document_part_keeps_text_verbatim() {
        assert_eq!(document_part("Clause 1."), "Document:\nClause 1.");
    }

    #[test]
    fn question_part_trims() {
        assert!(question_part("  When can I leave?\n").ends_with("\nWhen can I leave?"));
    }
}

//! Prompt text for every generation call the pipeline makes.

use studyrag_core::types::Intent;

use crate::tasks::QuestionType;

pub fn classification_system() -> String {
    let intents = [
        (Intent::AnswerGeneration, "write an exam answer to a question using marking schemes or notes"),
        (Intent::AnswerEvaluation, "grade or evaluate an answer the student wrote"),
        (Intent::DoubtClarification, "explain a concept or answer a conceptual question"),
        (Intent::QuestionGeneration, "create practice questions"),
        (Intent::ExamPaperGeneration, "assemble a complete exam paper"),
    ];
    let mut out = String::from(
        "You classify the intent of a student's request to a study assistant.\n\nIntents:\n",
    );
    for (n, (intent, description)) in intents.iter().enumerate() {
        out.push_str(&format!("{}. {} - {}\n", n + 1, intent.label(), description));
    }
    out.push_str("\nReply in exactly this format:\nINTENT: <intent>\nCONFIDENCE: <0.0-1.0>\nREASONING: <one sentence>");
    out
}

pub fn classification_user(query: &str) -> String {
    format!("Request: \"{query}\"")
}

pub const ANSWER_SYSTEM: &str = "You write exam answers for students. Follow the marking scheme when one is \
given, use clear academic language and structure answers with headings or bullet points where they help.";

pub fn answer_with_marking_scheme(question: &str, context: &str) -> String {
    format!(
        "Write a complete exam answer to the question below.\n\
         Cover every point of the marking scheme, in its order, and support each point with material from the notes.\n\n\
         QUESTION:\n{question}\n\nRESOURCES:\n{context}\n\nAnswer:"
    )
}

pub fn answer_from_notes(question: &str, context: &str) -> String {
    format!(
        "Write a complete answer to the question below using only the notes provided.\n\
         Open with a short introduction, cover the main points, and close with a conclusion.\n\n\
         QUESTION:\n{question}\n\nNOTES:\n{context}\n\nAnswer:"
    )
}

pub fn answer_general(question: &str) -> String {
    format!(
        "No study material matched this question. Write a well-structured exam answer from general knowledge.\n\n\
         QUESTION:\n{question}\n\nAnswer:"
    )
}

pub const EVALUATION_SYSTEM: &str = "You are a strict but fair examiner. Mark answers against the scheme given \
and justify every mark.";

pub fn evaluation(question: &str, reference: &str, student_answer: &str, has_marking_scheme: bool) -> String {
    let reference_label = if has_marking_scheme { "MARKING SCHEME" } else { "REFERENCE MATERIAL" };
    format!(
        "Evaluate the student answer.\n\n\
         QUESTION:\n{question}\n\n{reference_label}:\n{reference}\n\nSTUDENT ANSWER:\n{student_answer}\n\n\
         Reply in this format:\n\
         TOTAL_MARKS: <number>\n\
         OBTAINED_MARKS: <number>\n\n\
         POINT_BY_POINT:\n1. <scheme point> - <obtained>/<max> - <comment>\n\n\
         STRENGTHS:\n- <what the student did well>\n\n\
         IMPROVEMENTS:\n- <what to improve>"
    )
}

pub const DOUBT_NOTES_SYSTEM: &str = "You help students understand concepts. Answer from the notes you are given \
and say so plainly when the notes do not cover something.";

pub const DOUBT_GENERAL_SYSTEM: &str = "You are a knowledgeable tutor. Explain concepts clearly with examples, \
at the level of a university student.";

pub fn doubt_from_notes(query: &str, context: &str) -> String {
    format!(
        "Answer the question using only the notes below. Quote or paraphrase the relevant parts.\n\n\
         NOTES:\n{context}\n\nQUESTION:\n{query}\n\nAnswer:"
    )
}

pub fn doubt_general(query: &str) -> String {
    format!(
        "Answer the educational question below. Define the key terms, explain step by step and give an example.\n\n\
         QUESTION:\n{query}\n\nAnswer:"
    )
}

pub const NOTES_HEADER: &str = "## Answer (Based on Your Notes)\n\n";
pub const NOTES_FOOTER: &str = "\n\n---\n*This answer is based on your uploaded notes.*";
pub const GENERAL_HEADER: &str = "## Answer\n\n";
pub const GENERAL_FOOTER: &str = "\n\n---\n*This answer is based on general knowledge because your uploaded notes \
do not cover this topic. Check it against your study materials.*";

pub const QUESTIONS_SYSTEM: &str = "You write practice questions strictly from the study material provided. \
Questions must be unambiguous and test understanding. Follow the requested format exactly.";

pub fn questions(kind: QuestionType, count: usize, topic: &str, context: &str) -> String {
    let format_block = match kind {
        QuestionType::Mcq => "Q1. <question>\nA) <option>\nB) <option>\nC) <option>\nD) <option>\nCorrect: <A/B/C/D>",
        QuestionType::Short => "Q1. <question> (<marks> marks)\nExpected points: <two or three key points>",
        QuestionType::Long => "Q1. <question> (<marks> marks)\nMarking guide: <the points an answer must cover>",
        QuestionType::Numerical => "Q1. <problem statement with values>\nSolution: <worked steps>\nAnswer: <final value with units>",
    };
    let material = if context.is_empty() { "(no matching notes; use standard material for the topic)" } else { context };
    format!(
        "Write {count} {} questions.\n\nTOPIC: {topic}\n\nNOTES:\n{material}\n\n\
         Number the questions Q1., Q2., ... and use this format for each:\n{format_block}\n\n\
         Write the {count} questions now:",
        kind.describe()
    )
}

/// Wraps retrieved context around a query for the streaming chat path.
pub fn inject_context(context: &str, query: &str) -> String {
    format!(
        "Context information is below.\n---------------------\n{context}\n---------------------\n\
         Given the context information and not prior knowledge, answer the query.\nQuery: {query}"
    )
}

pub const STREAM_NOTES_SYSTEM: &str = "You are a study assistant. Answer from the context information supplied \
with the question, and keep answers focused on what the student asked.";

pub const STREAM_GENERAL_SYSTEM: &str = "You are a study assistant. None of the student's notes matched this \
question, so answer from general knowledge and suggest checking it against their course material.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_injection_layout() {
        assert_eq!(
            inject_context("CTX", "Q?"),
            "Context information is below.\n---------------------\nCTX\n---------------------\nGiven the context information and not prior knowledge, answer the query.\nQuery: Q?"
        );
    }

    #[test]
    fn classification_prompt_lists_every_intent() {
        let system = classification_system();
        for intent in Intent::ALL {
            assert!(system.contains(&intent.label()));
        }
        assert!(system.contains("INTENT:"));
    }
}

//! Prompt assembly.

/// Line separating the user's question from the message they replied to.
pub const REFERENCE_PREAMBLE: &str =
    "Use this to answer the question if it is relevant, otherwise ignore it:";

const DOCUMENT_PREAMBLE: &[&str] = &[
    "Using the provided document, answer the user question to the best of your ability. You must try to use information from the provided document. Combine information in the document into a coherent answer.",
    "If there is nothing in the document relevant to the user question, say 'Hmm, I don't know about that, try referencing the docs.', before providing any other information you know.",
    "Anything between the following `document` html blocks is retrieved from a knowledge bank, not part of the conversation with the user.",
];

/// Append the text of a replied-to message as optional context.
pub fn fold_reference(content: &str, referenced: &str) -> String {
    format!("{content}\n{REFERENCE_PREAMBLE}\n{referenced}")
}

/// Wrap `content` with retrieved documents so the model can ground its answer.
pub fn frame_with_documents(content: &str, documents: &[String]) -> String {
    let mut lines: Vec<&str> = DOCUMENT_PREAMBLE.to_vec();
    let joined = documents.join("\n");
    lines.extend([
        "<document>",
        joined.as_str(),
        "</document>",
        "Anything between the following `user` html blocks is part of the conversation with the user.",
        "<user>",
        content,
        "</user>",
    ]);
    lines.join("\n")
}

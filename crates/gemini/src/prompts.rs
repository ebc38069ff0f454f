//! Prompt assembly. The instruction texts are fixed; only the user's
//! language and topic are spliced in.

use afrolearn_core::language::Language;
use afrolearn_core::workspace::InputMode;

/// Characters of summary text sent to the speech model.
pub const TTS_CHAR_LIMIT: usize = 800;

/// Standing instruction for the tutor conversation.
pub fn tutor_system_instruction(language: &Language) -> String {
    format!(
        "You are an expert tutor for African students. \n\
         User Language: {} ({}).\n\
         Your goal is to explain concepts clearly, using local analogies \
         (e.g., mobile money, solar markets, local geography) where appropriate.\n\
         Always adapt your response style based on the instructions provided in the user's message.",
        language.native_name, language.name
    )
}

const VOICE_STYLE: &str = "[SYSTEM INSTRUCTION: RESPOND FOR AUDIO LISTENER]\n\
- Context: The user is listening to this via TTS.\n\
- Style: Podcast/Audiobook narration. Write for the ear, not the eye.\n\
- Formatting: STRICTLY TEXT ONLY. No markdown, no bullets, no bold, no latex ($..$).\n\
- Math: Speak formulas in words (e.g., \"one divided by R-one\").\n\
- Structure: Short sentences. Use verbal cues like \"Here's the thing...\" or \"Picture this...\".\n\
- Repetition: Briefly repeat key ideas in different words since the listener can't scroll back.\n\
- Length: 200-300 words.";

const TEXT_STYLE: &str = "[SYSTEM INSTRUCTION: RESPOND FOR TEXT READING]\n\
- Context: The user is reading this on a screen.\n\
- Style: Engaging educational article (TED-Ed / CrashCourse style).\n\
- Formatting: Use Paragraphs. Use Bold for emphasis.\n\
- Math: Use LaTeX format for formulas (e.g., $E=mc^2$).\n\
- Structure: Clear flow. Avoid \"Key Takeaways\" headers or bullet lists unless absolutely necessary.\n\
- Length: 250-400 words.";

/// Appends the style block matching how the query entered the system: a
/// spoken query gets narration formatting, a typed one gets article
/// formatting.
pub fn with_style(query: &str, mode: InputMode) -> String {
    let style = match mode {
        InputMode::Voice => VOICE_STYLE,
        InputMode::Text => TEXT_STYLE,
    };
    format!("{query}\n\n{style}")
}

pub fn concept_map_prompt(topic: &str) -> String {
    format!(
        "Generate a hierarchical concept map for the topic: \"{topic}\".\n\
         Return a JSON object with 'nodes' (list of {{id, label}}) and 'connections' (list of {{from, to}}).\n\
         The 'id' should be short unique strings. 'label' should be 2-4 words max.\n\
         Ensure there is one central node representing the main topic, connected to 3-5 main branches, \
         and each branch has 1-3 sub-branches.\n\
         Limit to 15 nodes total."
    )
}

pub fn infographic_prompt(topic: &str, language: &Language) -> String {
    format!(
        "Create a high-quality, educational infographic poster about \"{topic}\".\n\
         Target Audience: Students.\n\
         Key Requirement: The text inside the image MUST be in {} ({}).\n\
         Style: Modern vector art, colorful, clear typography, easy to read, dark background to match app theme.\n\
         Layout: Vertical layout, title at the top, 3-4 key sections with icons and brief text.",
        language.native_name, language.name
    )
}

pub fn transcription_instruction(language: &Language) -> String {
    format!(
        "Transcribe the spoken audio into text. The language is likely {} or English.\n\n\
         Context: An African student asking a question to an AI tutor.\n\
         Instructions:\n\
         - Transcribe the audio.\n\
         - Correct any spelling or grammatical errors (e.g. \"soler power\" -> \"solar power\").\n\
         - If terms are ambiguous, prioritize academic/educational terminology.\n\
         Return only the transcription text, no other commentary.",
        language.name
    )
}

/// Standing instruction for the live conversation overlay.
pub fn live_system_instruction(language: &Language, topic: Option<&str>) -> String {
    format!(
        "You are a friendly, enthusiastic tutor for an African student. \n\
         User Language: {}.\n\
         Current Topic: {}.\n\
         Keep responses concise (1-3 sentences), conversational, and encourage the student to speak. \n\
         When interrupted, stop immediately and listen.\n\
         Use local analogies where appropriate.",
        language.native_name,
        topic.unwrap_or("General Learning")
    )
}

/// Removes markdown control characters before speech synthesis.
pub fn strip_markdown(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '#' | '_' | '`'))
        .collect()
}

/// Strips markdown and cuts the text to the speech limit, appending an
/// ellipsis when something was dropped.
pub fn truncate_for_tts(text: &str) -> String {
    let clean = strip_markdown(text);
    let mut truncated: String = clean.chars().take(TTS_CHAR_LIMIT).collect();
    if clean.chars().count() > TTS_CHAR_LIMIT {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use afrolearn_core::language;

    #[test]
    fn typed_queries_get_article_formatting() {
        let prompt = with_style("Explain photosynthesis", InputMode::Text);
        assert!(prompt.starts_with("Explain photosynthesis\n\n"));
        assert!(prompt.contains("RESPOND FOR TEXT READING"));
        assert!(!prompt.contains("RESPOND FOR AUDIO LISTENER"));
    }

    #[test]
    fn spoken_queries_get_narration_formatting() {
        let prompt = with_style("Explain photosynthesis", InputMode::Voice);
        assert!(prompt.contains("RESPOND FOR AUDIO LISTENER"));
        assert!(prompt.contains("Podcast/Audiobook narration"));
    }

    #[test]
    fn tutor_instruction_addresses_the_chosen_language() {
        let sw = language::find("sw").unwrap();
        let instruction = tutor_system_instruction(sw);
        assert!(instruction.contains("User Language: Kiswahili (Kiswahili)"));
    }

    #[test]
    fn live_instruction_defaults_the_topic() {
        let yo = language::find("yo").unwrap();
        assert!(live_system_instruction(yo, None).contains("Current Topic: General Learning."));
        assert!(
            live_system_instruction(yo, Some("Photosynthesis"))
                .contains("Current Topic: Photosynthesis.")
        );
    }

    #[test]
    fn tts_text_is_stripped_and_truncated() {
        let long = format!("# Title\n**bold** {}", "a".repeat(900));
        let out = truncate_for_tts(&long);
        assert!(!out.contains('#'));
        assert!(!out.contains('*'));
        assert_eq!(out.chars().count(), TTS_CHAR_LIMIT + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn short_tts_text_is_left_alone() {
        assert_eq!(truncate_for_tts("short summary"), "short summary");
    }
}

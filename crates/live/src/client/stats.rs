use crate::types::ServerMessage;

/// Running counters over one live session, for the teardown log line.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    audio_chunks: u64,
    interruptions: u64,
    turns: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, message: &ServerMessage) {
        self.audio_chunks += message.audio_chunks().len() as u64;
        if message.is_interrupted() {
            self.interruptions += 1;
        }
        if message.is_turn_complete() {
            self.turns += 1;
        }
    }

    pub fn audio_chunks(&self) -> u64 {
        self.audio_chunks
    }

    pub fn interruptions(&self) -> u64 {
        self.interruptions
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_the_message_stream() {
        let mut stats = Stats::new();
        let audio: ServerMessage = serde_json::from_str(
            r#"{"serverContent": {"modelTurn": {"parts": [
                {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "UENN"}}
            ]}}}"#,
        )
        .unwrap();
        let interrupted: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"interrupted": true}}"#).unwrap();
        let done: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"turnComplete": true}}"#).unwrap();

        stats.record(&audio);
        stats.record(&audio);
        stats.record(&interrupted);
        stats.record(&done);

        assert_eq!(stats.audio_chunks(), 2);
        assert_eq!(stats.interruptions(), 1);
        assert_eq!(stats.turns(), 1);
    }
}

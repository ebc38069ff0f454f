use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::mindmap::{self, ConceptGraph};
use crate::workspace::{InlineImage, Workspace};

const EVENT_CAPACITY: usize = 32;

/// One in-flight request per content kind. Beginning a new request aborts
/// the stale task and bumps the generation, so a completion that lost the
/// race can never write back into the workspace.
#[derive(Debug, Default)]
struct RequestSlot {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl RequestSlot {
    fn begin(&mut self) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

/// Completion of a background request, tagged with the generation that
/// issued it.
#[derive(Debug)]
pub enum Outcome {
    Reply {
        generation: u64,
        result: anyhow::Result<String>,
    },
    ConceptGraph {
        generation: u64,
        result: anyhow::Result<ConceptGraph>,
    },
    Narration {
        generation: u64,
        result: anyhow::Result<Vec<f32>>,
    },
    Infographic {
        generation: u64,
        result: anyhow::Result<InlineImage>,
    },
    Transcription {
        generation: u64,
        result: anyhow::Result<String>,
    },
}

/// What an applied outcome changed, for the front end to react to.
#[derive(Debug, PartialEq)]
pub enum Update {
    SummaryReady,
    SummaryFailed,
    MindMapReady,
    MindMapFailed,
    NarrationReady(Vec<f32>),
    NarrationFailed,
    InfographicReady,
    InfographicFailed,
    TranscriptionReady(String),
    TranscriptionFailed,
}

/// Drives one session workspace against a generative backend. All network
/// work runs on spawned tasks; completions come back through the event
/// channel and are applied on the caller's schedule, which keeps every
/// workspace mutation on one task.
pub struct SessionController<B> {
    backend: Arc<B>,
    pub workspace: Workspace,
    events_tx: mpsc::Sender<Outcome>,
    events_rx: Option<mpsc::Receiver<Outcome>>,
    reply_slot: RequestSlot,
    map_slot: RequestSlot,
    narration_slot: RequestSlot,
    infographic_slot: RequestSlot,
    transcription_slot: RequestSlot,
}

impl<B: Backend + 'static> SessionController<B> {
    pub fn new(backend: Arc<B>, workspace: Workspace) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            backend,
            workspace,
            events_tx,
            events_rx: Some(events_rx),
            reply_slot: RequestSlot::default(),
            map_slot: RequestSlot::default(),
            narration_slot: RequestSlot::default(),
            infographic_slot: RequestSlot::default(),
            transcription_slot: RequestSlot::default(),
        }
    }

    /// Hands out the completion stream. Call once and poll it alongside the
    /// rest of the front end's event sources.
    pub fn take_events(&mut self) -> anyhow::Result<mpsc::Receiver<Outcome>> {
        self.events_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("events channel has already been taken"))
    }

    /// Starts a conversational turn. A query submitted while another is in
    /// flight supersedes it.
    pub fn submit_query(&mut self, query: &str) {
        self.workspace.begin_query(query);
        let mode = self.workspace.input_mode();
        let generation = self.reply_slot.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let query = query.to_string();
        self.reply_slot.handle = Some(tokio::spawn(async move {
            let result = backend.generate_reply(&query, mode).await;
            let _ = tx.send(Outcome::Reply { generation, result }).await;
        }));
    }

    /// Lazily fetches the concept graph for the current query. Returns
    /// false when there is nothing to map yet.
    pub fn request_mind_map(&mut self) -> bool {
        let Some(topic) = self.workspace.query().map(str::to_string) else {
            return false;
        };
        let generation = self.map_slot.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        self.map_slot.handle = Some(tokio::spawn(async move {
            let result = backend.generate_concept_graph(&topic).await;
            let _ = tx.send(Outcome::ConceptGraph { generation, result }).await;
        }));
        true
    }

    /// Requests narration audio for the current summary.
    pub fn request_narration(&mut self) -> bool {
        let Some(summary) = self.workspace.summary().map(str::to_string) else {
            return false;
        };
        let generation = self.narration_slot.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        self.narration_slot.handle = Some(tokio::spawn(async move {
            let result = backend.synthesize_speech(&summary).await;
            let _ = tx.send(Outcome::Narration { generation, result }).await;
        }));
        true
    }

    /// Requests an infographic poster for the current query.
    pub fn request_infographic(&mut self) -> bool {
        let Some(topic) = self.workspace.query().map(str::to_string) else {
            return false;
        };
        let generation = self.infographic_slot.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        self.infographic_slot.handle = Some(tokio::spawn(async move {
            let result = backend.generate_infographic(&topic).await;
            let _ = tx.send(Outcome::Infographic { generation, result }).await;
        }));
        true
    }

    /// Sends a recorded clip off for transcription.
    pub fn submit_transcription(&mut self, audio: Vec<u8>, mime_type: String) {
        let generation = self.transcription_slot.begin();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        self.transcription_slot.handle = Some(tokio::spawn(async move {
            let result = backend.transcribe(audio, &mime_type).await;
            let _ = tx.send(Outcome::Transcription { generation, result }).await;
        }));
    }

    /// Applies a completion to the workspace. Stale completions (superseded
    /// before they finished) are dropped and `None` is returned.
    pub fn apply(&mut self, outcome: Outcome) -> Option<Update> {
        match outcome {
            Outcome::Reply { generation, result } => {
                if !self.reply_slot.is_current(generation) {
                    return None;
                }
                Some(match result {
                    Ok(summary) => {
                        self.workspace.complete_query(summary);
                        Update::SummaryReady
                    }
                    Err(e) => {
                        tracing::error!("reply generation failed: {e:#}");
                        self.workspace.fail_query();
                        Update::SummaryFailed
                    }
                })
            }
            Outcome::ConceptGraph { generation, result } => {
                if !self.map_slot.is_current(generation) {
                    return None;
                }
                Some(match result {
                    Ok(graph) => {
                        self.workspace.set_mind_map(mindmap::layout_radial(&graph));
                        Update::MindMapReady
                    }
                    Err(e) => {
                        tracing::error!("concept graph generation failed: {e:#}");
                        Update::MindMapFailed
                    }
                })
            }
            Outcome::Narration { generation, result } => {
                if !self.narration_slot.is_current(generation) {
                    return None;
                }
                Some(match result {
                    Ok(samples) => Update::NarrationReady(samples),
                    Err(e) => {
                        tracing::error!("speech synthesis failed: {e:#}");
                        Update::NarrationFailed
                    }
                })
            }
            Outcome::Infographic { generation, result } => {
                if !self.infographic_slot.is_current(generation) {
                    return None;
                }
                Some(match result {
                    Ok(image) => {
                        self.workspace.set_infographic(image);
                        Update::InfographicReady
                    }
                    Err(e) => {
                        tracing::error!("infographic generation failed: {e:#}");
                        Update::InfographicFailed
                    }
                })
            }
            Outcome::Transcription { generation, result } => {
                if !self.transcription_slot.is_current(generation) {
                    return None;
                }
                Some(match result {
                    Ok(text) => {
                        self.workspace.mark_transcribed();
                        Update::TranscriptionReady(text)
                    }
                    Err(e) => {
                        tracing::error!("transcription failed: {e:#}");
                        Update::TranscriptionFailed
                    }
                })
            }
        }
    }
}

impl<B> Drop for SessionController<B> {
    fn drop(&mut self) {
        for slot in [
            &mut self.reply_slot,
            &mut self.map_slot,
            &mut self.narration_slot,
            &mut self.infographic_slot,
            &mut self.transcription_slot,
        ] {
            if let Some(handle) = slot.handle.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::language;
    use crate::mindmap::{ConceptNode, MapEdge};
    use crate::workspace::{FALLBACK_SUMMARY, InputMode, ProcessingStatus};

    fn controller(mock: MockBackend) -> SessionController<MockBackend> {
        let workspace = Workspace::new(language::find("sw").unwrap());
        SessionController::new(Arc::new(mock), workspace)
    }

    #[tokio::test]
    async fn submitted_query_completes_the_workspace() {
        let mut mock = MockBackend::new();
        mock.expect_generate_reply()
            .returning(|query, mode| {
                assert_eq!(query, "Explain photosynthesis");
                assert_eq!(mode, InputMode::Text);
                Box::pin(async { Ok("Plants turn light into sugar.".to_string()) })
            })
            .once();

        let mut ctrl = controller(mock);
        let mut events = ctrl.take_events().unwrap();
        ctrl.submit_query("Explain photosynthesis");

        let outcome = events.recv().await.expect("a completion should arrive");
        assert_eq!(ctrl.apply(outcome), Some(Update::SummaryReady));
        assert_eq!(ctrl.workspace.status(), ProcessingStatus::Completed);
        assert_eq!(ctrl.workspace.summary(), Some("Plants turn light into sugar."));
    }

    #[tokio::test]
    async fn transcribed_query_is_tagged_for_narration_style() {
        let mut mock = MockBackend::new();
        mock.expect_transcribe()
            .returning(|_, _| Box::pin(async { Ok("Explain photosynthesis".to_string()) }))
            .once();
        mock.expect_generate_reply()
            .returning(|_, mode| {
                assert_eq!(mode, InputMode::Voice);
                Box::pin(async { Ok("Picture this: a leaf is a solar panel.".to_string()) })
            })
            .once();

        let mut ctrl = controller(mock);
        let mut events = ctrl.take_events().unwrap();

        ctrl.submit_transcription(vec![0; 16], "audio/wav".to_string());
        let outcome = events.recv().await.unwrap();
        let Some(Update::TranscriptionReady(text)) = ctrl.apply(outcome) else {
            panic!("expected a transcription");
        };
        assert_eq!(ctrl.workspace.input_mode(), InputMode::Voice);

        ctrl.submit_query(&text);
        let outcome = events.recv().await.unwrap();
        assert_eq!(ctrl.apply(outcome), Some(Update::SummaryReady));
    }

    #[tokio::test]
    async fn superseding_query_aborts_the_stale_request() {
        let mut mock = MockBackend::new();
        let mut first = true;
        mock.expect_generate_reply().returning(move |_, _| {
            if std::mem::take(&mut first) {
                // The first request never finishes on its own; the abort
                // has to get rid of it.
                Box::pin(async {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    Ok("First answer".to_string())
                })
            } else {
                Box::pin(async { Ok("Second answer".to_string()) })
            }
        });

        let mut ctrl = controller(mock);
        let mut events = ctrl.take_events().unwrap();
        ctrl.submit_query("first question");
        ctrl.submit_query("second question");

        let outcome = events.recv().await.unwrap();
        assert_eq!(ctrl.apply(outcome), Some(Update::SummaryReady));
        assert_eq!(ctrl.workspace.summary(), Some("Second answer"));
    }

    #[tokio::test]
    async fn stale_completion_never_writes_back() {
        let mut mock = MockBackend::new();
        mock.expect_generate_reply()
            .returning(|_, _| Box::pin(async { Ok("Current answer".to_string()) }));

        let mut ctrl = controller(mock);
        let mut events = ctrl.take_events().unwrap();
        ctrl.submit_query("only question");

        // A completion from a generation that was superseded.
        let stale = Outcome::Reply {
            generation: 0,
            result: Ok("Stale answer".to_string()),
        };
        assert_eq!(ctrl.apply(stale), None);
        assert_eq!(ctrl.workspace.summary(), None);

        let outcome = events.recv().await.unwrap();
        assert_eq!(ctrl.apply(outcome), Some(Update::SummaryReady));
        assert_eq!(ctrl.workspace.summary(), Some("Current answer"));
    }

    #[tokio::test]
    async fn failed_reply_degrades_to_the_fallback_summary() {
        let mut mock = MockBackend::new();
        mock.expect_generate_reply()
            .returning(|_, _| Box::pin(async { Err(anyhow::anyhow!("network down")) }))
            .once();

        let mut ctrl = controller(mock);
        let mut events = ctrl.take_events().unwrap();
        ctrl.submit_query("anything");

        let outcome = events.recv().await.unwrap();
        assert_eq!(ctrl.apply(outcome), Some(Update::SummaryFailed));
        assert_eq!(ctrl.workspace.summary(), Some(FALLBACK_SUMMARY));
        assert_eq!(ctrl.workspace.status(), ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn mind_map_is_laid_out_on_arrival() {
        let mut mock = MockBackend::new();
        mock.expect_generate_reply()
            .returning(|_, _| Box::pin(async { Ok("The water cycle.".to_string()) }));
        mock.expect_generate_concept_graph()
            .returning(|topic| {
                assert_eq!(topic, "Water cycle");
                Box::pin(async {
                    Ok(ConceptGraph {
                        nodes: vec![
                            ConceptNode {
                                id: "root".to_string(),
                                label: "Water Cycle".to_string(),
                            },
                            ConceptNode {
                                id: "evap".to_string(),
                                label: "Evaporation".to_string(),
                            },
                        ],
                        connections: vec![MapEdge {
                            from: "root".to_string(),
                            to: "evap".to_string(),
                        }],
                    })
                })
            })
            .once();

        let mut ctrl = controller(mock);
        let mut events = ctrl.take_events().unwrap();
        ctrl.submit_query("Water cycle");
        let outcome = events.recv().await.unwrap();
        ctrl.apply(outcome);

        assert!(ctrl.request_mind_map());
        let outcome = events.recv().await.unwrap();
        assert_eq!(ctrl.apply(outcome), Some(Update::MindMapReady));

        let map = ctrl.workspace.mind_map().expect("map placed");
        assert_eq!(map.nodes.len(), 2);
        assert_eq!(map.nodes[0].level, 0);
    }

    #[tokio::test]
    async fn content_requests_need_a_query_first() {
        let mock = MockBackend::new();
        let mut ctrl = controller(mock);
        assert!(!ctrl.request_mind_map());
        assert!(!ctrl.request_infographic());
        assert!(!ctrl.request_narration());
    }
}

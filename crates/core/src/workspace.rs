use crate::language::Language;
use crate::mindmap::MindMap;

/// Fallback summary shown when a generation request fails. The failure is
/// logged; the workspace still completes so the UI stays usable.
pub const FALLBACK_SUMMARY: &str = "I apologize, but I encountered an error while \
analyzing your request. Please check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Summary,
    Audio,
    MindMap,
    Infographic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Processing,
    Completed,
}

/// How the current query entered the system. Typing flips to `Text`, a
/// transcribed recording flips to `Voice`; the reply style instruction is
/// chosen from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Text,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
}

/// Display record for a dropped file. Only metadata is kept; content never
/// leaves the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
}

/// An inline image payload as returned by the image endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// All view state for one session workspace. Every mode is an explicit
/// enum; transitions go through methods so illegal states stay
/// unrepresentable.
#[derive(Debug)]
pub struct Workspace {
    pub language: &'static Language,
    tab: Tab,
    status: ProcessingStatus,
    input_mode: InputMode,
    live: LiveStatus,
    query: Option<String>,
    summary: Option<String>,
    files: Vec<UploadedFile>,
    mind_map: Option<MindMap>,
    infographic: Option<InlineImage>,
}

impl Workspace {
    pub fn new(language: &'static Language) -> Self {
        Self {
            language,
            tab: Tab::default(),
            status: ProcessingStatus::default(),
            input_mode: InputMode::default(),
            live: LiveStatus::default(),
            query: None,
            summary: None,
            files: Vec::new(),
            mind_map: None,
            infographic: None,
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn input_mode(&self) -> InputMode {
        self.input_mode
    }

    /// The user typed into the input box.
    pub fn mark_typed(&mut self) {
        self.input_mode = InputMode::Text;
    }

    /// The input box was filled from a transcribed recording.
    pub fn mark_transcribed(&mut self) {
        self.input_mode = InputMode::Voice;
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn mind_map(&self) -> Option<&MindMap> {
        self.mind_map.as_ref()
    }

    pub fn mind_map_mut(&mut self) -> Option<&mut MindMap> {
        self.mind_map.as_mut()
    }

    pub fn infographic(&self) -> Option<&InlineImage> {
        self.infographic.as_ref()
    }

    /// Starts a new query. A query submitted while another is processing
    /// supersedes it; cancellation of the stale request is the caller's
    /// job (see `SessionController`). Previous derived content is cleared.
    pub fn begin_query(&mut self, query: impl Into<String>) {
        self.query = Some(query.into());
        self.summary = None;
        self.mind_map = None;
        self.infographic = None;
        self.status = ProcessingStatus::Processing;
    }

    pub fn complete_query(&mut self, summary: String) {
        self.summary = Some(summary);
        self.status = ProcessingStatus::Completed;
    }

    /// Degrades to the apology text and still completes, keeping the UI in
    /// a recoverable state.
    pub fn fail_query(&mut self) {
        self.summary = Some(FALLBACK_SUMMARY.to_string());
        self.status = ProcessingStatus::Completed;
    }

    pub fn set_mind_map(&mut self, map: MindMap) {
        self.mind_map = Some(map);
    }

    pub fn set_infographic(&mut self, image: InlineImage) {
        self.infographic = Some(image);
    }

    /// Records dropped files. When no query is active yet, a canned query
    /// string is derived from the first file and returned for submission.
    pub fn add_files(&mut self, files: Vec<UploadedFile>) -> Option<String> {
        if files.is_empty() {
            return None;
        }
        let first = files[0].name.clone();
        let extra = files.len() - 1;
        self.files.extend(files);
        if self.query.is_some() {
            return None;
        }
        Some(if extra > 0 {
            format!("Analyze {first} and {extra} other files")
        } else {
            format!("Analyze {first}")
        })
    }

    pub fn live(&self) -> LiveStatus {
        self.live
    }

    /// Advances the live-session lifecycle. Only the forward transitions of
    /// connecting -> connected -> disconnected (plus failure straight to
    /// disconnected and a fresh reconnect attempt) are representable.
    pub fn set_live(&mut self, next: LiveStatus) -> bool {
        use LiveStatus::*;
        let allowed = match (self.live, next) {
            (Disconnected, Connecting) => true,
            (Connecting, Connected) => true,
            (Connecting, Disconnected) => true,
            (Connected, Disconnected) => true,
            (Disconnected, Disconnected) => true,
            (Connecting, Connecting) | (Connected, Connecting) | (Connected, Connected) => false,
            (Disconnected, Connected) => false,
        };
        if allowed {
            self.live = next;
        } else {
            tracing::warn!(from = ?self.live, to = ?next, "ignoring invalid live transition");
        }
        allowed
    }

    /// Loads the canned Solar System session without any network call.
    pub fn load_demo(&mut self) {
        self.query = Some("The Solar System".to_string());
        self.summary = Some(
            "# The Solar System\n\nOur solar system consists of our star, the Sun, \
             and everything bound to it by gravity."
                .to_string(),
        );
        self.status = ProcessingStatus::Completed;
        self.tab = Tab::MindMap;
        self.mind_map = Some(MindMap::demo());
        self.infographic = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language;

    fn workspace() -> Workspace {
        Workspace::new(language::find("sw").unwrap())
    }

    #[test]
    fn query_lifecycle_clears_derived_content() {
        let mut ws = workspace();
        ws.begin_query("Explain photosynthesis");
        ws.complete_query("Plants convert light into sugar.".to_string());
        ws.set_mind_map(MindMap::demo());
        ws.set_infographic(InlineImage {
            mime_type: "image/png".to_string(),
            data: vec![1, 2, 3],
        });

        ws.begin_query("Explain osmosis");
        assert_eq!(ws.status(), ProcessingStatus::Processing);
        assert_eq!(ws.query(), Some("Explain osmosis"));
        assert!(ws.summary().is_none());
        assert!(ws.mind_map().is_none());
        assert!(ws.infographic().is_none());
    }

    #[test]
    fn failed_query_degrades_to_fallback_text() {
        let mut ws = workspace();
        ws.begin_query("anything");
        ws.fail_query();
        assert_eq!(ws.status(), ProcessingStatus::Completed);
        assert_eq!(ws.summary(), Some(FALLBACK_SUMMARY));
    }

    #[test]
    fn input_mode_follows_entry_path() {
        let mut ws = workspace();
        assert_eq!(ws.input_mode(), InputMode::Text);
        ws.mark_transcribed();
        assert_eq!(ws.input_mode(), InputMode::Voice);
        ws.mark_typed();
        assert_eq!(ws.input_mode(), InputMode::Text);
    }

    #[test]
    fn dropped_files_derive_a_query_only_once() {
        let mut ws = workspace();
        let file = |name: &str| UploadedFile {
            name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            size: 1024,
        };
        let auto = ws.add_files(vec![file("notes.pdf"), file("slides.pdf")]);
        assert_eq!(auto.as_deref(), Some("Analyze notes.pdf and 1 other files"));
        ws.begin_query(auto.unwrap());

        assert_eq!(ws.add_files(vec![file("more.pdf")]), None);
        assert_eq!(ws.files().len(), 3);
    }

    #[test]
    fn single_file_query_has_no_suffix() {
        let mut ws = workspace();
        let auto = ws.add_files(vec![UploadedFile {
            name: "essay.docx".to_string(),
            mime_type: "application/msword".to_string(),
            size: 2048,
        }]);
        assert_eq!(auto.as_deref(), Some("Analyze essay.docx"));
    }

    #[test]
    fn live_lifecycle_rejects_illegal_jumps() {
        let mut ws = workspace();
        assert!(!ws.set_live(LiveStatus::Connected));
        assert_eq!(ws.live(), LiveStatus::Disconnected);

        assert!(ws.set_live(LiveStatus::Connecting));
        assert!(ws.set_live(LiveStatus::Connected));
        assert!(!ws.set_live(LiveStatus::Connecting));
        assert!(ws.set_live(LiveStatus::Disconnected));

        // A failed connect goes straight back to disconnected.
        assert!(ws.set_live(LiveStatus::Connecting));
        assert!(ws.set_live(LiveStatus::Disconnected));
    }

    #[test]
    fn demo_session_is_preloaded() {
        let mut ws = workspace();
        ws.load_demo();
        assert_eq!(ws.tab(), Tab::MindMap);
        assert_eq!(ws.status(), ProcessingStatus::Completed);
        assert_eq!(ws.query(), Some("The Solar System"));
        assert_eq!(ws.mind_map().unwrap().nodes.len(), 9);
    }
}

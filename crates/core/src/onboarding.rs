use crate::language::{self, Language};

/// Result of a completed onboarding flow. Lives in memory for the lifetime
/// of the process; there is no persistence.
#[derive(Debug, Clone, Copy)]
pub struct UserSession {
    pub language: &'static Language,
}

/// Language selection gate. Continuing is impossible until exactly one
/// language has been picked; once a `UserSession` is produced it carries the
/// choice forward and never reverts.
#[derive(Debug, Default)]
pub struct Onboarding {
    selected: Option<&'static Language>,
}

impl Onboarding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a language by catalog id. Re-selection simply replaces the
    /// previous choice. Returns the resolved language, or `None` for an
    /// unknown id.
    pub fn select(&mut self, id: &str) -> Option<&'static Language> {
        let lang = language::find(id)?;
        self.selected = Some(lang);
        Some(lang)
    }

    pub fn selected(&self) -> Option<&'static Language> {
        self.selected
    }

    pub fn can_continue(&self) -> bool {
        self.selected.is_some()
    }

    /// Label for the continue affordance, mirroring the selection state.
    pub fn continue_label(&self) -> String {
        match self.selected {
            Some(lang) => format!("Continue in {}", lang.native_name),
            None => "Select a Language".to_string(),
        }
    }

    /// Transitions into the workspace. Fails (returns `None`) while nothing
    /// is selected.
    pub fn complete(&self) -> Option<UserSession> {
        self.selected.map(|language| UserSession { language })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continue_is_gated_on_selection() {
        let mut onboarding = Onboarding::new();
        assert!(!onboarding.can_continue());
        assert!(onboarding.complete().is_none());
        assert_eq!(onboarding.continue_label(), "Select a Language");

        assert!(onboarding.select("sw").is_some());
        assert!(onboarding.can_continue());
        assert_eq!(onboarding.continue_label(), "Continue in Kiswahili");

        let session = onboarding.complete().expect("selection made");
        assert_eq!(session.language.id, "sw");
    }

    #[test]
    fn unknown_id_does_not_select() {
        let mut onboarding = Onboarding::new();
        assert!(onboarding.select("zz").is_none());
        assert!(!onboarding.can_continue());
    }

    #[test]
    fn reselection_replaces_choice() {
        let mut onboarding = Onboarding::new();
        onboarding.select("en");
        onboarding.select("yo");
        assert_eq!(onboarding.selected().unwrap().id, "yo");
    }
}

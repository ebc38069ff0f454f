/// A learning language offered during onboarding. The catalog is static and
/// a language is chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub id: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    pub greeting: &'static str,
    pub flag: &'static str,
}

pub const SUPPORTED_LANGUAGES: [Language; 7] = [
    Language {
        id: "en",
        name: "English",
        native_name: "English",
        greeting: "Hello",
        flag: "\u{1F1EC}\u{1F1E7}",
    },
    Language {
        id: "sw",
        name: "Kiswahili",
        native_name: "Kiswahili",
        greeting: "Hujambo",
        flag: "\u{1F1F9}\u{1F1FF}",
    },
    Language {
        id: "tw",
        name: "Twi",
        native_name: "Twi",
        greeting: "Maakye",
        flag: "\u{1F1EC}\u{1F1ED}",
    },
    Language {
        id: "yo",
        name: "Yoruba",
        native_name: "Yor\u{f9}b\u{e1}",
        greeting: "Bawo",
        flag: "\u{1F1F3}\u{1F1EC}",
    },
    Language {
        id: "rw",
        name: "Kinyarwanda",
        native_name: "Ikinyarwanda",
        greeting: "Muraho",
        flag: "\u{1F1F7}\u{1F1FC}",
    },
    Language {
        id: "am",
        name: "Amharic",
        native_name: "\u{12A0}\u{121B}\u{122D}\u{129B}",
        greeting: "Selam",
        flag: "\u{1F1EA}\u{1F1F9}",
    },
    Language {
        id: "ha",
        name: "Hausa",
        native_name: "Harshen Hausa",
        greeting: "Sannu",
        flag: "\u{1F1F3}\u{1F1EC}",
    },
];

pub fn find(id: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.id == id)
}

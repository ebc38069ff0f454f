/// Display metadata for a dashboard card. There is no backing store; these
/// exist only to populate the featured list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudySession {
    pub id: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub date: &'static str,
    pub source_count: u32,
    pub gradient: &'static str,
    pub icon: &'static str,
}

pub const FEATURED_SESSIONS: [StudySession; 4] = [
    StudySession {
        id: "1",
        title: "Pan-African History",
        subtitle: "From Ancient Civilizations to Modern Independence",
        date: "12 Jul 2025",
        source_count: 36,
        gradient: "from-blue-900 via-indigo-900 to-purple-900",
        icon: "History",
    },
    StudySession {
        id: "2",
        title: "Introduction to Swahili",
        subtitle: "Basic grammar and conversational skills",
        date: "15 May 2025",
        source_count: 12,
        gradient: "from-brand-900 via-amber-900 to-orange-900",
        icon: "Languages",
    },
    StudySession {
        id: "3",
        title: "Agriculture Tech in Africa",
        subtitle: "Innovations driving food security",
        date: "10 Aug 2025",
        source_count: 24,
        gradient: "from-green-900 via-emerald-900 to-teal-900",
        icon: "Sprout",
    },
    StudySession {
        id: "4",
        title: "The Geneva Convention",
        subtitle: "Key protocols and international law",
        date: "2 Sep 2025",
        source_count: 8,
        gradient: "from-slate-800 via-gray-800 to-zinc-800",
        icon: "Scale",
    },
];

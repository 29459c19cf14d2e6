pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const PERSON: &str = "👤";
    pub const TEACHER: &str = "🧑‍🏫";
    pub const BOOK: &str = "📚";
    pub const VIDEO: &str = "🎬";
    pub const AUDIO: &str = "🎧";
    pub const TEXT: &str = "📄";
    pub const QUIZ: &str = "❓";
    pub const SEED: &str = "🌱";
    pub const STAR: &str = "⭐";
    pub const EMPTY: &str = "∅";
}

pub fn lesson_icon(kind: crate::LessonType) -> &'static str {
    match kind {
        crate::LessonType::Video => Icons::VIDEO,
        crate::LessonType::Audio => Icons::AUDIO,
        crate::LessonType::Text => Icons::TEXT,
        crate::LessonType::Quiz => Icons::QUIZ,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LessonType;

    #[test]
    fn test_each_lesson_type_has_its_own_icon() {
        let icons: std::collections::HashSet<_> = LessonType::all().iter().map(|k| lesson_icon(*k)).collect();
        assert_eq!(icons.len(), LessonType::all().len());
    }
}

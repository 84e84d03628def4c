/// Languages the site ships translations and canned replies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Spanish,
    French,
    Portuguese,
    German,
    Chinese,
    Japanese,
}

impl Language {
    pub const CANONICAL: Language = Language::English;

    const ALL: [Language; 7] = [
        Language::English,
        Language::Spanish,
        Language::French,
        Language::Portuguese,
        Language::German,
        Language::Chinese,
        Language::Japanese,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::Portuguese => "pt",
            Language::German => "de",
            Language::Chinese => "zh",
            Language::Japanese => "ja",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::Portuguese => "Portuguese",
            Language::German => "German",
            Language::Chinese => "Chinese",
            Language::Japanese => "Japanese",
        }
    }

    fn native_name(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Spanish => "español",
            Language::French => "français",
            Language::Portuguese => "português",
            Language::German => "deutsch",
            Language::Chinese => "中文",
            Language::Japanese => "日本語",
        }
    }

    /// Resolves a code (`es`, `pt-BR`), English name or native name.
    pub fn from_tag(tag: &str) -> Option<Language> {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return None;
        }
        let primary = tag.split(['-', '_']).next().unwrap_or(tag.as_str());
        Self::ALL.into_iter().find(|lang| {
            lang.code() == primary || lang.name().to_lowercase() == tag || lang.native_name() == tag
        })
    }
}

/// True when `tag` asks for the canonical language, including when it is absent.
pub fn is_canonical(tag: Option<&str>) -> bool {
    match tag.map(str::trim) {
        None | Some("") => true,
        Some(tag) => Language::from_tag(tag) == Some(Language::CANONICAL),
    }
}

/// Name to put in prompts: the English name when known, the raw tag otherwise.
pub fn display_name(tag: &str) -> String {
    Language::from_tag(tag)
        .map(|lang| lang.name().to_string())
        .unwrap_or_else(|| tag.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_codes_names_and_regions() {
        assert_eq!(Language::from_tag("es"), Some(Language::Spanish));
        assert_eq!(Language::from_tag("Spanish"), Some(Language::Spanish));
        assert_eq!(Language::from_tag("Español"), Some(Language::Spanish));
        assert_eq!(Language::from_tag("pt-BR"), Some(Language::Portuguese));
        assert_eq!(Language::from_tag("日本語"), Some(Language::Japanese));
        assert_eq!(Language::from_tag("Klingon"), None);
    }

    #[test]
    fn canonical_covers_absent_and_english_variants() {
        assert!(is_canonical(None));
        assert!(is_canonical(Some("  ")));
        assert!(is_canonical(Some("en")));
        assert!(is_canonical(Some("en-US")));
        assert!(is_canonical(Some("English")));
        assert!(!is_canonical(Some("fr")));
        assert!(!is_canonical(Some("Klingon")));
    }

    #[test]
    fn display_name_keeps_unknown_tags() {
        assert_eq!(display_name("de"), "German");
        assert_eq!(display_name(" Klingon "), "Klingon");
    }
}

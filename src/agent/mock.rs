//! Canned replies used when no live model is configured.
//!
//! The mock replaces generation and translation together: every table is written
//! directly in its language. Selection is pure and total.

use super::language::Language;
use crate::conversation::{Role, Turn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Greeting,
    Experience,
    Portfolio,
    Skills,
}

// Checked in order; the first category with a matching keyword wins.
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Experience,
        &["experience", "experiencia", "expérience", "experiência", "erfahrung"],
    ),
    (
        Category::Portfolio,
        &["portfolio", "portafolio", "portfólio", "portefeuille"],
    ),
    (
        Category::Skills,
        &[
            "skills", "technologies", "habilidades", "tecnologías", "compétences",
            "competências", "tecnologias", "fähigkeiten", "technologien",
        ],
    ),
];

/// Category of the latest user turn in `history`.
pub fn categorize(history: &[Turn]) -> Category {
    let Some(last_user) = history.iter().rev().find(|t| t.role == Role::User) else {
        return Category::Greeting;
    };
    let text = last_user.content.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Greeting)
}

fn canned(language: Language, category: Category) -> Option<&'static str> {
    use Category::*;
    use Language::*;
    let text = match (language, category) {
        (English, Greeting) => "I'm {owner}'s portfolio agent. How can I help you learn about {owner}'s professional experience?",
        (English, Experience) => "{owner} has extensive experience in web development and has worked on a wide range of projects.",
        (English, Portfolio) => "You can find {owner}'s portfolio on the main page of this website.",
        (English, Skills) => "{owner} specializes in React, Node.js and modern web technologies.",

        (Spanish, Greeting) => "Soy el agente del portafolio de {owner}. ¿Cómo puedo ayudarte a conocer su experiencia profesional?",
        (Spanish, Experience) => "{owner} tiene amplia experiencia en desarrollo web y ha trabajado en proyectos muy variados.",
        (Spanish, Portfolio) => "Puedes encontrar el portafolio de {owner} en la página principal de este sitio web.",
        (Spanish, Skills) => "{owner} se especializa en React, Node.js y tecnologías web modernas.",

        (French, Greeting) => "Je suis l'agent du portfolio de {owner}. Comment puis-je vous aider à découvrir son expérience professionnelle ?",
        (French, Experience) => "{owner} a une vaste expérience en développement web et a travaillé sur des projets très variés.",
        (French, Portfolio) => "Vous trouverez le portfolio de {owner} sur la page principale de ce site.",
        (French, Skills) => "{owner} est spécialisé en React, Node.js et technologies web modernes.",

        (Portuguese, Greeting) => "Sou o agente do portfólio de {owner}. Como posso ajudar você a conhecer a experiência profissional dele?",
        (Portuguese, Experience) => "{owner} tem ampla experiência em desenvolvimento web e já trabalhou em projetos muito variados.",
        (Portuguese, Portfolio) => "Você encontra o portfólio de {owner} na página principal deste site.",
        (Portuguese, Skills) => "{owner} é especialista em React, Node.js e tecnologias web modernas.",

        (German, Greeting) => "Ich bin der Portfolio-Agent von {owner}. Wie kann ich dir helfen, mehr über seine berufliche Erfahrung zu erfahren?",
        (German, Experience) => "{owner} hat umfangreiche Erfahrung in der Webentwicklung und an vielen verschiedenen Projekten gearbeitet.",
        (German, Portfolio) => "Das Portfolio von {owner} findest du auf der Startseite dieser Website.",
        (German, Skills) => "{owner} ist auf React, Node.js und moderne Webtechnologien spezialisiert.",

        (Chinese, _) | (Japanese, _) => return None,
    };
    Some(text)
}

/// Deterministic reply for `history` in the language named by `language_tag`.
///
/// Unknown or untabled languages get the canonical table.
pub fn respond(history: &[Turn], language_tag: Option<&str>, owner: &str) -> String {
    let category = categorize(history);
    let language = language_tag
        .and_then(Language::from_tag)
        .unwrap_or(Language::CANONICAL);
    let template = canned(language, category)
        .or_else(|| canned(Language::CANONICAL, category))
        .unwrap_or("I'm {owner}'s portfolio agent.");
    template.replace("{owner}", owner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(text: &str) -> Vec<Turn> {
        vec![Turn::assistant("Welcome!"), Turn::user(text)]
    }

    #[test]
    fn keywords_select_categories_in_precedence_order() {
        assert_eq!(categorize(&ask("Tell me about your experience")), Category::Experience);
        assert_eq!(categorize(&ask("Where is the PORTFOLIO?")), Category::Portfolio);
        assert_eq!(categorize(&ask("What are your skills?")), Category::Skills);
        assert_eq!(categorize(&ask("Which technologies?")), Category::Skills);
        assert_eq!(
            categorize(&ask("experience with portfolio skills")),
            Category::Experience
        );
        assert_eq!(categorize(&ask("hi")), Category::Greeting);
        assert_eq!(categorize(&[Turn::assistant("Welcome!")]), Category::Greeting);
    }

    #[test]
    fn latest_user_turn_decides() {
        let history = vec![
            Turn::user("your experience?"),
            Turn::assistant("..."),
            Turn::user("and your skills?"),
        ];
        assert_eq!(categorize(&history), Category::Skills);
    }

    #[test]
    fn spanish_skills_question() {
        let reply = respond(&ask("What are your skills?"), Some("Spanish"), "Pedro");
        assert_eq!(reply, "Pedro se especializa en React, Node.js y tecnologías web modernas.");
    }

    #[test]
    fn localized_keywords_match() {
        let reply = respond(&ask("¿Cuál es tu experiencia?"), Some("es"), "Pedro");
        assert!(reply.starts_with("Pedro tiene amplia experiencia"));
    }

    #[test]
    fn untabled_languages_fall_back_to_canonical() {
        let reply = respond(&ask("hello"), Some("ja"), "Pedro");
        assert!(reply.starts_with("I'm Pedro's portfolio agent."));
        let reply = respond(&ask("hello"), Some("Klingon"), "Pedro");
        assert!(reply.starts_with("I'm Pedro's portfolio agent."));
    }

    #[test]
    fn replies_are_never_empty() {
        let inputs = ["", "skills", "\u{0}", "日本語のテキスト", "experience portfolio"];
        let languages = [None, Some(""), Some("en"), Some("es"), Some("fr"), Some("pt"), Some("de"), Some("zh"), Some("xx")];
        for input in inputs {
            for language in languages {
                assert!(!respond(&ask(input), language, "Pedro").is_empty());
            }
        }
    }
}

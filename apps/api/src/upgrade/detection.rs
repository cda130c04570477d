//! Parameter detection: best-effort starting configuration for a stored prompt.
//!
//! NOT authoritative. Each field group (purpose, complexity, tone, domain) has an
//! ordered rule list; the first rule whose keyword appears wins for that group.
//! Groups are independent, so one pass may set all four. When keywords from two
//! rules of the same group both appear (say "beginner" and "advanced"), the
//! earlier rule wins.
//!
//! Keywords match at word starts only: "test" matches "tests" but not "latest".

use serde::Serialize;
use tracing::debug;

use crate::upgrade::parameters::{
    ComplexityLevel, Domain, Enhancement, LanguageStyle, Purpose, TargetAudience, Tone,
    UpgradeParameters, VocabularyLevel,
};

struct Rule {
    name: &'static str,
    keywords: &'static [&'static str],
    apply: fn(&mut UpgradeParameters),
}

#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub parameters: UpgradeParameters,
    /// Names of the rules that fired, in group order.
    pub matched_rules: Vec<&'static str>,
}

const PURPOSE_RULES: &[Rule] = &[
    Rule {
        name: "purpose:debugging",
        keywords: &["debug", "fix", "error", "bug", "crash", "broken"],
        apply: |p| {
            p.purpose = Purpose::Debugging;
            p.set_flag(Enhancement::IncludeTroubleshooting, true);
            p.set_flag(Enhancement::AddErrorHandling, true);
        },
    },
    Rule {
        name: "purpose:testing",
        keywords: &["test", "qa", "coverage"],
        apply: |p| {
            p.purpose = Purpose::Testing;
            p.set_flag(Enhancement::AddEdgeCases, true);
            p.set_flag(Enhancement::IncludeValidation, true);
        },
    },
    Rule {
        name: "purpose:review",
        keywords: &["review", "critique", "feedback", "audit"],
        apply: |p| {
            p.purpose = Purpose::Review;
            p.set_flag(Enhancement::IncludeBestPractices, true);
        },
    },
    Rule {
        name: "purpose:refactoring",
        keywords: &["refactor", "clean up", "restructure", "rewrite"],
        apply: |p| {
            p.purpose = Purpose::Refactoring;
            p.set_flag(Enhancement::IncludeBestPractices, true);
        },
    },
    Rule {
        name: "purpose:optimization",
        keywords: &["optimi", "performance", "speed up", "faster", "efficien"],
        apply: |p| {
            p.purpose = Purpose::Optimization;
            p.set_flag(Enhancement::IncludeAlternatives, true);
        },
    },
    Rule {
        name: "purpose:documentation",
        keywords: &["document", "readme", "docs", "docstring"],
        apply: |p| {
            p.purpose = Purpose::Documentation;
            p.set_flag(Enhancement::StrengthenStructure, true);
        },
    },
    Rule {
        name: "purpose:translation",
        keywords: &["translat"],
        apply: |p| p.purpose = Purpose::Translation,
    },
    Rule {
        name: "purpose:code_generation",
        keywords: &["code", "function", "implement", "script", "program", "class"],
        apply: |p| {
            p.purpose = Purpose::CodeGeneration;
            p.set_flag(Enhancement::IncludeExamples, true);
        },
    },
    Rule {
        name: "purpose:explanation",
        keywords: &["explain", "what is", "how does", "teach"],
        apply: |p| {
            p.purpose = Purpose::Explanation;
            p.set_flag(Enhancement::IncludeExamples, true);
        },
    },
    Rule {
        name: "purpose:analysis",
        keywords: &["analy", "evaluate", "compare", "assess"],
        apply: |p| {
            p.purpose = Purpose::Analysis;
            p.set_flag(Enhancement::IncludeReasoning, true);
        },
    },
    Rule {
        name: "purpose:research",
        keywords: &["research", "investigate", "literature"],
        apply: |p| {
            p.purpose = Purpose::Research;
            p.set_flag(Enhancement::IncludeResources, true);
        },
    },
    Rule {
        name: "purpose:planning",
        keywords: &["plan", "roadmap", "schedule", "milestone"],
        apply: |p| {
            p.purpose = Purpose::Planning;
            p.set_flag(Enhancement::StrengthenStructure, true);
        },
    },
    Rule {
        name: "purpose:creative",
        keywords: &["story", "poem", "creative", "fiction", "lyrics"],
        apply: |p| {
            p.purpose = Purpose::Creative;
            p.set_flag(Enhancement::BoostCreativity, true);
        },
    },
];

const COMPLEXITY_RULES: &[Rule] = &[
    Rule {
        name: "complexity:beginner",
        keywords: &["beginner", "basic", "simple", "newbie", "introduct", "eli5"],
        apply: |p| {
            p.complexity_level = ComplexityLevel::Beginner;
            p.vocabulary_level = VocabularyLevel::Simple;
            p.target_audience = TargetAudience::Beginner;
        },
    },
    Rule {
        name: "complexity:expert",
        keywords: &["expert", "advanced", "complex", "in-depth", "sophisticated"],
        apply: |p| {
            p.complexity_level = ComplexityLevel::Advanced;
            p.vocabulary_level = VocabularyLevel::Technical;
            p.target_audience = TargetAudience::Expert;
        },
    },
];

const TONE_RULES: &[Rule] = &[
    Rule {
        name: "tone:casual",
        keywords: &["casual", "informal", "fun", "chatty", "friendly"],
        apply: |p| {
            p.tone = Tone::Casual;
            p.language_style = LanguageStyle::Informal;
        },
    },
    Rule {
        name: "tone:formal",
        keywords: &["formal", "official", "professional"],
        apply: |p| {
            p.tone = Tone::Formal;
            p.language_style = LanguageStyle::Formal;
        },
    },
    Rule {
        name: "tone:persuasive",
        keywords: &["persuade", "persuasive", "convince", "pitch", "sales"],
        apply: |p| p.tone = Tone::Persuasive,
    },
    Rule {
        name: "tone:creative",
        keywords: &["story", "imaginative", "whimsical"],
        apply: |p| p.tone = Tone::Creative,
    },
    Rule {
        name: "tone:technical",
        keywords: &["technical", "api", "algorithm", "architecture", "implementation"],
        apply: |p| {
            p.tone = Tone::Technical;
            p.language_style = LanguageStyle::Technical;
        },
    },
];

const DOMAIN_RULES: &[Rule] = &[
    Rule {
        name: "domain:creative_writing",
        keywords: &["story", "poem", "novel", "fiction", "screenplay"],
        apply: |p| p.domain = Domain::CreativeWriting,
    },
    Rule {
        name: "domain:machine_learning",
        keywords: &["machine learning", "ml", "neural", "deep learning", "llm"],
        apply: |p| p.domain = Domain::MachineLearning,
    },
    Rule {
        name: "domain:web_development",
        keywords: &["react", "html", "css", "frontend", "javascript", "web"],
        apply: |p| p.domain = Domain::WebDevelopment,
    },
    Rule {
        name: "domain:devops",
        keywords: &["docker", "kubernetes", "ci/cd", "deploy", "terraform", "devops"],
        apply: |p| p.domain = Domain::Devops,
    },
    Rule {
        name: "domain:security",
        keywords: &["security", "vulnerab", "encrypt", "exploit", "authenticat"],
        apply: |p| p.domain = Domain::Security,
    },
    Rule {
        name: "domain:data_science",
        keywords: &["data", "pandas", "sql", "statistic"],
        apply: |p| p.domain = Domain::DataScience,
    },
    Rule {
        name: "domain:software_engineering",
        keywords: &["code", "function", "software", "rust", "python", "java", "bug"],
        apply: |p| p.domain = Domain::SoftwareEngineering,
    },
    Rule {
        name: "domain:marketing",
        keywords: &["marketing", "seo", "campaign", "brand", "copywriting"],
        apply: |p| p.domain = Domain::Marketing,
    },
    Rule {
        name: "domain:finance",
        keywords: &["financ", "invest", "budget", "accounting"],
        apply: |p| p.domain = Domain::Finance,
    },
    Rule {
        name: "domain:business",
        keywords: &["business", "startup", "revenue", "market"],
        apply: |p| p.domain = Domain::Business,
    },
    Rule {
        name: "domain:healthcare",
        keywords: &["health", "medical", "patient", "clinical"],
        apply: |p| p.domain = Domain::Healthcare,
    },
    Rule {
        name: "domain:legal",
        keywords: &["legal", "contract", "law", "compliance"],
        apply: |p| p.domain = Domain::Legal,
    },
    Rule {
        name: "domain:education",
        keywords: &["lesson", "student", "course", "curriculum"],
        apply: |p| p.domain = Domain::Education,
    },
    Rule {
        name: "domain:science",
        keywords: &["science", "physics", "chemistry", "biology", "experiment"],
        apply: |p| p.domain = Domain::Science,
    },
];

const RULE_GROUPS: &[&[Rule]] = &[PURPOSE_RULES, COMPLEXITY_RULES, TONE_RULES, DOMAIN_RULES];

/// Suggests parameters for a stored prompt from its content and category.
pub fn detect_parameters(content: &str, category: &str) -> Detection {
    let haystack = format!("{} {}", content.to_lowercase(), category.to_lowercase());
    let mut parameters = UpgradeParameters::default();
    let mut matched_rules = Vec::new();

    for group in RULE_GROUPS {
        if let Some(rule) = group
            .iter()
            .find(|r| r.keywords.iter().any(|k| contains_word_start(&haystack, k)))
        {
            (rule.apply)(&mut parameters);
            matched_rules.push(rule.name);
        }
    }

    debug!("Parameter detection matched rules: {:?}", matched_rules);
    Detection {
        parameters,
        matched_rules,
    }
}

/// True when `needle` occurs in `haystack` at the start of a word.
fn contains_word_start(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_keywords_set_purpose_and_flags() {
        let d = detect_parameters("Please fix this crash in my parser", "");
        assert_eq!(d.parameters.purpose, Purpose::Debugging);
        assert!(d.parameters.is_enabled(Enhancement::IncludeTroubleshooting));
        assert!(d.parameters.is_enabled(Enhancement::AddErrorHandling));
        assert!(d.matched_rules.contains(&"purpose:debugging"));
    }

    #[test]
    fn test_beginner_keywords_set_three_fields() {
        let d = detect_parameters("A simple intro to closures", "");
        assert_eq!(d.parameters.complexity_level, ComplexityLevel::Beginner);
        assert_eq!(d.parameters.vocabulary_level, VocabularyLevel::Simple);
        assert_eq!(d.parameters.target_audience, TargetAudience::Beginner);
    }

    #[test]
    fn test_no_match_keeps_defaults() {
        let d = detect_parameters("Hello there", "misc");
        assert_eq!(d.parameters, UpgradeParameters::default());
        assert!(d.matched_rules.is_empty());
    }

    #[test]
    fn test_first_rule_wins_within_group() {
        let d = detect_parameters("An advanced guide for the beginner", "");
        assert_eq!(d.parameters.complexity_level, ComplexityLevel::Beginner);
    }

    #[test]
    fn test_groups_are_detected_independently() {
        let d = detect_parameters("Fix the React component, keep it casual", "");
        assert_eq!(d.parameters.purpose, Purpose::Debugging);
        assert_eq!(d.parameters.domain, Domain::WebDevelopment);
        assert_eq!(d.parameters.tone, Tone::Casual);
        assert_eq!(d.matched_rules.len(), 3);
    }

    #[test]
    fn test_category_participates_in_detection() {
        let d = detect_parameters("Summarize quarterly numbers", "Marketing");
        assert_eq!(d.parameters.domain, Domain::Marketing);
    }

    #[test]
    fn test_keywords_match_word_starts_only() {
        let d = detect_parameters("Summarize the latest prefix notation", "");
        assert_eq!(d.parameters.purpose, Purpose::General);
        let d = detect_parameters("Write unit tests for the cache", "");
        assert_eq!(d.parameters.purpose, Purpose::Testing);
    }

    #[test]
    fn test_contains_word_start() {
        assert!(contains_word_start("debugging now", "debug"));
        assert!(contains_word_start("(react)", "react"));
        assert!(!contains_word_start("html page", "ml"));
        assert!(!contains_word_start("", "x"));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let a = detect_parameters("Optimize this SQL query", "database");
        let b = detect_parameters("Optimize this SQL query", "database");
        assert_eq!(a.parameters, b.parameters);
        assert_eq!(a.matched_rules, b.matched_rules);
    }
}

//! Template registry: named, fully specified parameter sets applied in one step.
//!
//! Applying a template replaces every field except `custom_instructions`.
//! Template guidance, when present, is appended to the user's own instructions.

use std::sync::OnceLock;

use serde::Serialize;
use thiserror::Error;

use crate::upgrade::parameters::{
    ComplexityLevel, Depth, DetailLevel, Domain, Enhancement, EnhancementSet, LanguageStyle,
    OutputFormat, Purpose, ResponseStyle, TargetAudience, Tone, UpgradeParameters,
    VocabularyLevel,
};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unknown template: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct UpgradeTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: UpgradeParameters,
    /// Appended to the user's custom instructions on application.
    pub guidance: Option<&'static str>,
}

fn flags(enabled: &[Enhancement]) -> EnhancementSet {
    enabled.iter().copied().collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn build_registry() -> Vec<UpgradeTemplate> {
    use Enhancement::*;

    vec![
        UpgradeTemplate {
            name: "Code Generation",
            description: "Precise, production-minded prompts for writing new code",
            parameters: UpgradeParameters {
                purpose: Purpose::CodeGeneration,
                tone: Tone::Technical,
                detail_level: DetailLevel::Detailed,
                complexity_level: ComplexityLevel::Intermediate,
                depth: Depth::Deep,
                target_audience: TargetAudience::Developers,
                output_format: OutputFormat::CodeFocused,
                response_style: ResponseStyle::Direct,
                language_style: LanguageStyle::Technical,
                vocabulary_level: VocabularyLevel::Technical,
                domain: Domain::SoftwareEngineering,
                enhancements: flags(&[
                    IncludeExamples,
                    IncludeConstraints,
                    IncludeBestPractices,
                    IncludeValidation,
                    ImproveClarity,
                    EnhanceSpecificity,
                    AddErrorHandling,
                    AddEdgeCases,
                    EnableMarkdown,
                ]),
                priority_focus: strings(&["correctness", "readability"]),
                ..UpgradeParameters::default()
            },
            guidance: None,
        },
        UpgradeTemplate {
            name: "Debugging",
            description: "Systematic diagnosis of errors and unexpected behavior",
            parameters: UpgradeParameters {
                purpose: Purpose::Debugging,
                tone: Tone::Technical,
                detail_level: DetailLevel::Detailed,
                complexity_level: ComplexityLevel::Advanced,
                depth: Depth::Deep,
                target_audience: TargetAudience::Developers,
                output_format: OutputFormat::StepByStep,
                response_style: ResponseStyle::Analytical,
                language_style: LanguageStyle::Technical,
                vocabulary_level: VocabularyLevel::Technical,
                domain: Domain::SoftwareEngineering,
                enhancements: flags(&[
                    IncludeContext,
                    IncludeReasoning,
                    IncludeTroubleshooting,
                    IncludeValidation,
                    EnhanceSpecificity,
                    AddErrorHandling,
                    AddEdgeCases,
                    EnableMarkdown,
                    AddChainOfThought,
                    IncludeVerificationSteps,
                ]),
                ..UpgradeParameters::default()
            },
            guidance: Some(
                "Ask for the exact error message, the expected versus actual behavior, \
                 and the smallest input that reproduces the problem.",
            ),
        },
        UpgradeTemplate {
            name: "Documentation",
            description: "Clear reference and how-to documentation",
            parameters: UpgradeParameters {
                purpose: Purpose::Documentation,
                tone: Tone::Professional,
                detail_level: DetailLevel::Comprehensive,
                complexity_level: ComplexityLevel::Intermediate,
                depth: Depth::Moderate,
                target_audience: TargetAudience::General,
                output_format: OutputFormat::Structured,
                response_style: ResponseStyle::Instructional,
                language_style: LanguageStyle::Formal,
                vocabulary_level: VocabularyLevel::Moderate,
                domain: Domain::SoftwareEngineering,
                enhancements: flags(&[
                    IncludeExamples,
                    IncludeContext,
                    IncludeBestPractices,
                    IncludeWarnings,
                    IncludeResources,
                    ImproveClarity,
                    StrengthenStructure,
                    EnhanceReadability,
                    EnableMarkdown,
                ]),
                ..UpgradeParameters::default()
            },
            guidance: None,
        },
        UpgradeTemplate {
            name: "Code Review",
            description: "Thorough, prioritized feedback on existing code",
            parameters: UpgradeParameters {
                purpose: Purpose::Review,
                tone: Tone::Professional,
                detail_level: DetailLevel::Detailed,
                complexity_level: ComplexityLevel::Advanced,
                depth: Depth::Deep,
                target_audience: TargetAudience::Developers,
                output_format: OutputFormat::Structured,
                response_style: ResponseStyle::Analytical,
                language_style: LanguageStyle::Technical,
                vocabulary_level: VocabularyLevel::Technical,
                domain: Domain::SoftwareEngineering,
                enhancements: flags(&[
                    IncludeAlternatives,
                    IncludeReasoning,
                    IncludeBestPractices,
                    IncludeWarnings,
                    EnhanceSpecificity,
                    AddEdgeCases,
                    ImproveCoherence,
                    EnableMarkdown,
                    IncludeSelfReflection,
                    AddMultiPerspective,
                ]),
                ..UpgradeParameters::default()
            },
            guidance: Some(
                "Ask for findings ranked by severity, each tied to the exact code it concerns.",
            ),
        },
        UpgradeTemplate {
            name: "Optimization",
            description: "Measured performance and efficiency improvements",
            parameters: UpgradeParameters {
                purpose: Purpose::Optimization,
                tone: Tone::Technical,
                detail_level: DetailLevel::Detailed,
                complexity_level: ComplexityLevel::Expert,
                depth: Depth::Deep,
                target_audience: TargetAudience::Expert,
                output_format: OutputFormat::Structured,
                response_style: ResponseStyle::Analytical,
                language_style: LanguageStyle::Technical,
                vocabulary_level: VocabularyLevel::Technical,
                domain: Domain::SoftwareEngineering,
                enhancements: flags(&[
                    IncludeConstraints,
                    IncludeAlternatives,
                    IncludeReasoning,
                    IncludeValidation,
                    EnhanceSpecificity,
                    AddEdgeCases,
                    EnableMarkdown,
                    AddChainOfThought,
                    IncludeVerificationSteps,
                    AddIterativeRefinement,
                ]),
                priority_focus: strings(&["measurable performance gains"]),
                ..UpgradeParameters::default()
            },
            guidance: None,
        },
        UpgradeTemplate {
            name: "Creative Writing",
            description: "Vivid, original prose without rigid structure",
            parameters: UpgradeParameters {
                purpose: Purpose::Creative,
                tone: Tone::Creative,
                detail_level: DetailLevel::Detailed,
                complexity_level: ComplexityLevel::Intermediate,
                depth: Depth::Moderate,
                target_audience: TargetAudience::General,
                output_format: OutputFormat::Paragraph,
                response_style: ResponseStyle::Narrative,
                language_style: LanguageStyle::Informal,
                vocabulary_level: VocabularyLevel::Advanced,
                domain: Domain::CreativeWriting,
                enhancements: flags(&[
                    IncludeExamples,
                    IncludeContext,
                    BoostCreativity,
                    ImproveFlow,
                    EnhanceReadability,
                    ImproveCoherence,
                    PreventLists,
                    AddIterativeRefinement,
                ]),
                avoid_patterns: strings(&["clichés", "generic openings"]),
                ..UpgradeParameters::default()
            },
            guidance: None,
        },
        UpgradeTemplate {
            name: "Analysis",
            description: "Structured, evidence-driven analysis and reports",
            parameters: UpgradeParameters {
                purpose: Purpose::Analysis,
                tone: Tone::Professional,
                detail_level: DetailLevel::Comprehensive,
                complexity_level: ComplexityLevel::Advanced,
                depth: Depth::Deep,
                target_audience: TargetAudience::Business,
                output_format: OutputFormat::Report,
                response_style: ResponseStyle::Analytical,
                language_style: LanguageStyle::Formal,
                vocabulary_level: VocabularyLevel::Advanced,
                domain: Domain::General,
                enhancements: flags(&[
                    IncludeContext,
                    IncludeAlternatives,
                    IncludeReasoning,
                    IncludeValidation,
                    ImproveClarity,
                    EnhanceSpecificity,
                    StrengthenStructure,
                    ImproveCoherence,
                    EnableMarkdown,
                    AddChainOfThought,
                    AddMultiPerspective,
                ]),
                ..UpgradeParameters::default()
            },
            guidance: None,
        },
        UpgradeTemplate {
            name: "Research",
            description: "Rigorous research questions with sourced answers",
            parameters: UpgradeParameters {
                purpose: Purpose::Research,
                tone: Tone::Formal,
                detail_level: DetailLevel::Comprehensive,
                complexity_level: ComplexityLevel::Advanced,
                depth: Depth::Comprehensive,
                target_audience: TargetAudience::Academic,
                output_format: OutputFormat::Report,
                response_style: ResponseStyle::Analytical,
                language_style: LanguageStyle::Academic,
                vocabulary_level: VocabularyLevel::Advanced,
                domain: Domain::Science,
                enhancements: flags(&[
                    IncludeContext,
                    IncludeReasoning,
                    IncludeResources,
                    IncludeValidation,
                    EnhanceSpecificity,
                    StrengthenStructure,
                    ImproveCoherence,
                    AddContextAwareness,
                    EnableMarkdown,
                    AddMultiPerspective,
                    IncludeVerificationSteps,
                ]),
                ..UpgradeParameters::default()
            },
            guidance: Some(
                "Ask for the evidence behind each claim and an explicit statement of uncertainty.",
            ),
        },
        UpgradeTemplate {
            name: "Beginner Friendly",
            description: "Gentle explanations for newcomers",
            parameters: UpgradeParameters {
                purpose: Purpose::Explanation,
                tone: Tone::Friendly,
                detail_level: DetailLevel::Detailed,
                complexity_level: ComplexityLevel::Beginner,
                depth: Depth::Surface,
                target_audience: TargetAudience::Beginner,
                output_format: OutputFormat::StepByStep,
                response_style: ResponseStyle::Instructional,
                language_style: LanguageStyle::Plain,
                vocabulary_level: VocabularyLevel::Simple,
                domain: Domain::Education,
                enhancements: flags(&[
                    IncludeExamples,
                    IncludeContext,
                    IncludeWarnings,
                    IncludeResources,
                    ImproveClarity,
                    ImproveFlow,
                    EnhanceReadability,
                    AddContextAwareness,
                    EnableMarkdown,
                ]),
                avoid_patterns: strings(&["unexplained jargon"]),
                ..UpgradeParameters::default()
            },
            guidance: None,
        },
        UpgradeTemplate {
            name: "Testing",
            description: "Test plans and test code with strong edge case coverage",
            parameters: UpgradeParameters {
                purpose: Purpose::Testing,
                tone: Tone::Technical,
                detail_level: DetailLevel::Detailed,
                complexity_level: ComplexityLevel::Intermediate,
                depth: Depth::Deep,
                target_audience: TargetAudience::Developers,
                output_format: OutputFormat::CodeFocused,
                response_style: ResponseStyle::Instructional,
                language_style: LanguageStyle::Technical,
                vocabulary_level: VocabularyLevel::Technical,
                domain: Domain::SoftwareEngineering,
                enhancements: flags(&[
                    IncludeExamples,
                    IncludeConstraints,
                    IncludeValidation,
                    EnhanceSpecificity,
                    AddErrorHandling,
                    AddEdgeCases,
                    EnableMarkdown,
                    IncludeVerificationSteps,
                ]),
                ..UpgradeParameters::default()
            },
            guidance: None,
        },
    ]
}

/// All registered templates, in display order.
pub fn list_templates() -> &'static [UpgradeTemplate] {
    static REGISTRY: OnceLock<Vec<UpgradeTemplate>> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

/// Looks up a template by name, ignoring ASCII case.
pub fn find_template(name: &str) -> Option<&'static UpgradeTemplate> {
    let name = name.trim();
    list_templates()
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

/// Applies a named template on top of `current`.
pub fn apply_template(
    current: &UpgradeParameters,
    name: &str,
) -> Result<UpgradeParameters, TemplateError> {
    let template = find_template(name).ok_or_else(|| TemplateError::Unknown(name.to_string()))?;

    let mut next = template.parameters.clone();
    next.custom_instructions = merge_guidance(&current.custom_instructions, template.guidance);
    Ok(next)
}

/// Re-applying the same template does not duplicate its guidance.
fn merge_guidance(existing: &str, guidance: Option<&str>) -> String {
    match guidance {
        None => existing.to_string(),
        Some(g) if existing.trim().is_empty() => g.to_string(),
        Some(g) if existing.contains(g) => existing.to_string(),
        Some(g) => format!("{}\n\n{g}", existing.trim_end()),
    }
}

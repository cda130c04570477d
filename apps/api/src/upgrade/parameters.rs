//! Upgrade parameters: the closed configuration that steers a prompt rewrite.
//!
//! Two halves:
//! - eleven enumerated choice fields, each a closed vocabulary
//! - a set of enabled `Enhancement` flags
//!
//! On the wire every flag is still its own named boolean (`"include_examples": true`),
//! so existing clients keep working. Internally the flags live in an ordered set and
//! the compiler renders them by walking a table, never by field-by-field branching.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ────────────────────────────────────────────────────────────────────────────
// Enumerated choice fields
// ────────────────────────────────────────────────────────────────────────────

/// Declares a closed choice enum with its wire names, `ALL`, `as_str()` and `label()`.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident,
        { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            /// Human-readable label: underscores become spaces.
            pub fn label(self) -> String {
                self.as_str().replace('_', " ")
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum! {
    /// What the prompt is meant to accomplish.
    Purpose, default = General, {
        CodeGeneration => "code_generation",
        Analysis => "analysis",
        Documentation => "documentation",
        Debugging => "debugging",
        Creative => "creative",
        General => "general",
        Testing => "testing",
        Refactoring => "refactoring",
        Optimization => "optimization",
        Explanation => "explanation",
        Translation => "translation",
        Research => "research",
        Planning => "planning",
        Review => "review",
    }
}

choice_enum! {
    Tone, default = Professional, {
        Professional => "professional",
        Casual => "casual",
        Friendly => "friendly",
        Formal => "formal",
        Technical => "technical",
        Creative => "creative",
        Authoritative => "authoritative",
        Conversational => "conversational",
        Persuasive => "persuasive",
        Neutral => "neutral",
    }
}

choice_enum! {
    DetailLevel, default = Detailed, {
        Minimal => "minimal",
        Concise => "concise",
        Moderate => "moderate",
        Detailed => "detailed",
        Comprehensive => "comprehensive",
    }
}

choice_enum! {
    ComplexityLevel, default = Intermediate, {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Expert => "expert",
    }
}

choice_enum! {
    Depth, default = Moderate, {
        Surface => "surface",
        Moderate => "moderate",
        Deep => "deep",
        Comprehensive => "comprehensive",
    }
}

choice_enum! {
    TargetAudience, default = General, {
        General => "general",
        Beginner => "beginner",
        Intermediate => "intermediate",
        Expert => "expert",
        Developers => "developers",
        Business => "business",
        Academic => "academic",
        Students => "students",
    }
}

choice_enum! {
    OutputFormat, default = Structured, {
        Paragraph => "paragraph",
        Structured => "structured",
        StepByStep => "step_by_step",
        CodeFocused => "code_focused",
        Conversational => "conversational",
        Report => "report",
        Outline => "outline",
    }
}

choice_enum! {
    ResponseStyle, default = Explanatory, {
        Direct => "direct",
        Explanatory => "explanatory",
        Socratic => "socratic",
        Narrative => "narrative",
        Analytical => "analytical",
        Instructional => "instructional",
    }
}

choice_enum! {
    LanguageStyle, default = Formal, {
        Formal => "formal",
        Informal => "informal",
        Technical => "technical",
        Plain => "plain",
        Academic => "academic",
        Conversational => "conversational",
    }
}

choice_enum! {
    VocabularyLevel, default = Moderate, {
        Simple => "simple",
        Moderate => "moderate",
        Advanced => "advanced",
        Technical => "technical",
    }
}

choice_enum! {
    Domain, default = General, {
        General => "general",
        SoftwareEngineering => "software_engineering",
        WebDevelopment => "web_development",
        DataScience => "data_science",
        MachineLearning => "machine_learning",
        Devops => "devops",
        Security => "security",
        Business => "business",
        Education => "education",
        Healthcare => "healthcare",
        Finance => "finance",
        Legal => "legal",
        Marketing => "marketing",
        CreativeWriting => "creative_writing",
        Science => "science",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Enhancement flags
// ────────────────────────────────────────────────────────────────────────────

/// Which block of the compiled prompt a flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementGroup {
    Content,
    Quality,
    Advanced,
}

impl EnhancementGroup {
    pub const ALL: [EnhancementGroup; 3] = [
        EnhancementGroup::Content,
        EnhancementGroup::Quality,
        EnhancementGroup::Advanced,
    ];
}

/// One independently togglable enhancement. Declaration order is render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Enhancement {
    // content
    IncludeExamples,
    IncludeConstraints,
    IncludeContext,
    IncludeAlternatives,
    IncludeReasoning,
    IncludeTroubleshooting,
    IncludeBestPractices,
    IncludeWarnings,
    IncludeResources,
    IncludeValidation,
    // quality
    ImproveClarity,
    EnhanceSpecificity,
    BoostCreativity,
    StrengthenStructure,
    AddErrorHandling,
    ImproveFlow,
    EnhanceReadability,
    AddEdgeCases,
    ImproveCoherence,
    AddContextAwareness,
    EnableMarkdown,
    PreventLists,
    // advanced
    AddChainOfThought,
    IncludeSelfReflection,
    AddMultiPerspective,
    IncludeVerificationSteps,
    AddIterativeRefinement,
    IncludeFallbackStrategies,
}

impl Enhancement {
    pub const ALL: &'static [Enhancement] = &[
        Enhancement::IncludeExamples,
        Enhancement::IncludeConstraints,
        Enhancement::IncludeContext,
        Enhancement::IncludeAlternatives,
        Enhancement::IncludeReasoning,
        Enhancement::IncludeTroubleshooting,
        Enhancement::IncludeBestPractices,
        Enhancement::IncludeWarnings,
        Enhancement::IncludeResources,
        Enhancement::IncludeValidation,
        Enhancement::ImproveClarity,
        Enhancement::EnhanceSpecificity,
        Enhancement::BoostCreativity,
        Enhancement::StrengthenStructure,
        Enhancement::AddErrorHandling,
        Enhancement::ImproveFlow,
        Enhancement::EnhanceReadability,
        Enhancement::AddEdgeCases,
        Enhancement::ImproveCoherence,
        Enhancement::AddContextAwareness,
        Enhancement::EnableMarkdown,
        Enhancement::PreventLists,
        Enhancement::AddChainOfThought,
        Enhancement::IncludeSelfReflection,
        Enhancement::AddMultiPerspective,
        Enhancement::IncludeVerificationSteps,
        Enhancement::AddIterativeRefinement,
        Enhancement::IncludeFallbackStrategies,
    ];

    /// Wire name of the flag (the JSON boolean field).
    pub fn as_str(self) -> &'static str {
        match self {
            Enhancement::IncludeExamples => "include_examples",
            Enhancement::IncludeConstraints => "include_constraints",
            Enhancement::IncludeContext => "include_context",
            Enhancement::IncludeAlternatives => "include_alternatives",
            Enhancement::IncludeReasoning => "include_reasoning",
            Enhancement::IncludeTroubleshooting => "include_troubleshooting",
            Enhancement::IncludeBestPractices => "include_best_practices",
            Enhancement::IncludeWarnings => "include_warnings",
            Enhancement::IncludeResources => "include_resources",
            Enhancement::IncludeValidation => "include_validation",
            Enhancement::ImproveClarity => "improve_clarity",
            Enhancement::EnhanceSpecificity => "enhance_specificity",
            Enhancement::BoostCreativity => "boost_creativity",
            Enhancement::StrengthenStructure => "strengthen_structure",
            Enhancement::AddErrorHandling => "add_error_handling",
            Enhancement::ImproveFlow => "improve_flow",
            Enhancement::EnhanceReadability => "enhance_readability",
            Enhancement::AddEdgeCases => "add_edge_cases",
            Enhancement::ImproveCoherence => "improve_coherence",
            Enhancement::AddContextAwareness => "add_context_awareness",
            Enhancement::EnableMarkdown => "enable_markdown",
            Enhancement::PreventLists => "prevent_lists",
            Enhancement::AddChainOfThought => "add_chain_of_thought",
            Enhancement::IncludeSelfReflection => "include_self_reflection",
            Enhancement::AddMultiPerspective => "add_multi_perspective",
            Enhancement::IncludeVerificationSteps => "include_verification_steps",
            Enhancement::AddIterativeRefinement => "add_iterative_refinement",
            Enhancement::IncludeFallbackStrategies => "include_fallback_strategies",
        }
    }

    pub fn from_name(name: &str) -> Option<Enhancement> {
        Enhancement::ALL.iter().copied().find(|e| e.as_str() == name)
    }

    pub fn group(self) -> EnhancementGroup {
        match self {
            Enhancement::IncludeExamples
            | Enhancement::IncludeConstraints
            | Enhancement::IncludeContext
            | Enhancement::IncludeAlternatives
            | Enhancement::IncludeReasoning
            | Enhancement::IncludeTroubleshooting
            | Enhancement::IncludeBestPractices
            | Enhancement::IncludeWarnings
            | Enhancement::IncludeResources
            | Enhancement::IncludeValidation => EnhancementGroup::Content,
            Enhancement::AddChainOfThought
            | Enhancement::IncludeSelfReflection
            | Enhancement::AddMultiPerspective
            | Enhancement::IncludeVerificationSteps
            | Enhancement::AddIterativeRefinement
            | Enhancement::IncludeFallbackStrategies => EnhancementGroup::Advanced,
            _ => EnhancementGroup::Quality,
        }
    }
}

impl fmt::Display for Enhancement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of enabled flags. Serializes as one named boolean per known flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancementSet(BTreeSet<Enhancement>);

impl EnhancementSet {
    pub fn contains(&self, flag: Enhancement) -> bool {
        self.0.contains(&flag)
    }

    pub fn set(&mut self, flag: Enhancement, enabled: bool) {
        if enabled {
            self.0.insert(flag);
        } else {
            self.0.remove(&flag);
        }
    }

    /// Enabled flags in render order.
    pub fn iter(&self) -> impl Iterator<Item = Enhancement> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Enhancement> for EnhancementSet {
    fn from_iter<I: IntoIterator<Item = Enhancement>>(iter: I) -> Self {
        EnhancementSet(iter.into_iter().collect())
    }
}

impl Serialize for EnhancementSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Enhancement::ALL.len()))?;
        for flag in Enhancement::ALL {
            map.serialize_entry(flag.as_str(), &self.contains(*flag))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnhancementSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FlagVisitor;

        impl<'de> Visitor<'de> for FlagVisitor {
            type Value = EnhancementSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of enhancement flag names to booleans")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut flags = BTreeSet::new();
                while let Some(key) = map.next_key::<String>()? {
                    match Enhancement::from_name(&key) {
                        Some(flag) => {
                            if map.next_value::<Option<bool>>()?.unwrap_or(false) {
                                flags.insert(flag);
                            }
                        }
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(EnhancementSet(flags))
            }
        }

        deserializer.deserialize_map(FlagVisitor)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// UpgradeParameters
// ────────────────────────────────────────────────────────────────────────────

/// Full configuration for one prompt upgrade.
///
/// Every flag combination is legal, including none at all. A posted parameter
/// object is authoritative for every flag: a flag it does not mention is off,
/// so `{"tone": "casual"}` carries no flags at all. Only an omitted parameter
/// object falls back to the default flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeParameters {
    pub purpose: Purpose,
    pub tone: Tone,
    pub detail_level: DetailLevel,
    pub complexity_level: ComplexityLevel,
    pub depth: Depth,
    pub target_audience: TargetAudience,
    pub output_format: OutputFormat,
    pub response_style: ResponseStyle,
    pub language_style: LanguageStyle,
    pub vocabulary_level: VocabularyLevel,
    pub domain: Domain,
    #[serde(flatten)]
    pub enhancements: EnhancementSet,
    pub custom_instructions: String,
    pub priority_focus: Vec<String>,
    pub avoid_patterns: Vec<String>,
}

/// Flags enabled in a fresh session.
const DEFAULT_FLAGS: &[Enhancement] = &[
    Enhancement::IncludeExamples,
    Enhancement::IncludeContext,
    Enhancement::ImproveClarity,
    Enhancement::EnhanceSpecificity,
    Enhancement::StrengthenStructure,
    Enhancement::EnableMarkdown,
];

impl Default for UpgradeParameters {
    fn default() -> Self {
        Self {
            purpose: Purpose::default(),
            tone: Tone::default(),
            detail_level: DetailLevel::default(),
            complexity_level: ComplexityLevel::default(),
            depth: Depth::default(),
            target_audience: TargetAudience::default(),
            output_format: OutputFormat::default(),
            response_style: ResponseStyle::default(),
            language_style: LanguageStyle::default(),
            vocabulary_level: VocabularyLevel::default(),
            domain: Domain::default(),
            enhancements: DEFAULT_FLAGS.iter().copied().collect(),
            custom_instructions: String::new(),
            priority_focus: Vec::new(),
            avoid_patterns: Vec::new(),
        }
    }
}

impl UpgradeParameters {
    pub fn is_enabled(&self, flag: Enhancement) -> bool {
        self.enhancements.contains(flag)
    }

    pub fn set_flag(&mut self, flag: Enhancement, enabled: bool) {
        self.enhancements.set(flag, enabled);
    }

    /// Replaces the enabled flags wholesale.
    #[cfg(test)]
    pub fn with_flags(mut self, flags: &[Enhancement]) -> Self {
        self.enhancements = flags.iter().copied().collect();
        self
    }

    /// Enabled flags of one group, in render order.
    pub fn enabled_in(&self, group: EnhancementGroup) -> impl Iterator<Item = Enhancement> + '_ {
        self.enhancements.iter().filter(move |f| f.group() == group)
    }

    /// `(field name, human-readable label)` for every choice field, in render order.
    pub fn choice_labels(&self) -> [(&'static str, String); 11] {
        [
            ("Purpose", self.purpose.label()),
            ("Tone", self.tone.label()),
            ("Detail level", self.detail_level.label()),
            ("Complexity level", self.complexity_level.label()),
            ("Depth", self.depth.label()),
            ("Target audience", self.target_audience.label()),
            ("Output format", self.output_format.label()),
            ("Response style", self.response_style.label()),
            ("Language style", self.language_style.label()),
            ("Vocabulary level", self.vocabulary_level.label()),
            ("Domain", self.domain.label()),
        ]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Allowed values
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChoiceOptions {
    pub field: &'static str,
    pub values: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlagGroupOptions {
    pub group: EnhancementGroup,
    pub flags: Vec<&'static str>,
}

/// Every accepted wire value, for building parameter editors.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterOptions {
    pub choices: Vec<ChoiceOptions>,
    pub enhancements: Vec<FlagGroupOptions>,
}

fn choice<T: Copy>(field: &'static str, all: &[T], as_str: fn(T) -> &'static str) -> ChoiceOptions {
    ChoiceOptions {
        field,
        values: all.iter().map(|v| as_str(*v)).collect(),
    }
}

pub fn parameter_options() -> ParameterOptions {
    let choices = vec![
        choice("purpose", Purpose::ALL, Purpose::as_str),
        choice("tone", Tone::ALL, Tone::as_str),
        choice("detail_level", DetailLevel::ALL, DetailLevel::as_str),
        choice("complexity_level", ComplexityLevel::ALL, ComplexityLevel::as_str),
        choice("depth", Depth::ALL, Depth::as_str),
        choice("target_audience", TargetAudience::ALL, TargetAudience::as_str),
        choice("output_format", OutputFormat::ALL, OutputFormat::as_str),
        choice("response_style", ResponseStyle::ALL, ResponseStyle::as_str),
        choice("language_style", LanguageStyle::ALL, LanguageStyle::as_str),
        choice("vocabulary_level", VocabularyLevel::ALL, VocabularyLevel::as_str),
        choice("domain", Domain::ALL, Domain::as_str),
    ];

    let enhancements = EnhancementGroup::ALL
        .iter()
        .map(|&group| FlagGroupOptions {
            group,
            flags: Enhancement::ALL
                .iter()
                .filter(|f| f.group() == group)
                .map(|f| f.as_str())
                .collect(),
        })
        .collect();

    ParameterOptions {
        choices,
        enhancements,
    }
}

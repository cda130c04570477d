//! Prompt compiler: renders (original prompt, analysis, parameters) into the single
//! instruction string sent to the completion provider.
//!
//! Pure and deterministic: no I/O, no clock, no randomness. Any well-typed
//! `UpgradeParameters` renders, including one with every flag off.
//!
//! Flag directives come from the ordered tables below. Adding an enhancement
//! means adding a variant and one table row; the renderer does not change.

use tracing::debug;

use crate::llm_client::strip_code_fences;
use crate::upgrade::analysis::PromptAnalysis;
use crate::upgrade::parameters::{Enhancement, EnhancementGroup, UpgradeParameters};

// ────────────────────────────────────────────────────────────────────────────
// Directive tables
// ────────────────────────────────────────────────────────────────────────────

pub const CONTENT_DIRECTIVES: &[(Enhancement, &str)] = &[
    (Enhancement::IncludeExamples, "Include relevant, practical examples that illustrate the expected output"),
    (Enhancement::IncludeConstraints, "State explicit constraints, limits, and requirements the response must respect"),
    (Enhancement::IncludeContext, "Provide the background context needed to understand the task"),
    (Enhancement::IncludeAlternatives, "Ask for alternative approaches and when each one is preferable"),
    (Enhancement::IncludeReasoning, "Request the reasoning behind key decisions"),
    (Enhancement::IncludeTroubleshooting, "Cover common problems and how to troubleshoot them"),
    (Enhancement::IncludeBestPractices, "Incorporate established best practices for the domain"),
    (Enhancement::IncludeWarnings, "Flag pitfalls and risks the reader should be warned about"),
    (Enhancement::IncludeResources, "Point to further resources for deeper learning"),
    (Enhancement::IncludeValidation, "Describe how to validate that the result is correct"),
];

pub const QUALITY_DIRECTIVES: &[(Enhancement, &str)] = &[
    (Enhancement::ImproveClarity, "Rewrite ambiguous phrasing so every instruction has a single clear meaning"),
    (Enhancement::EnhanceSpecificity, "Replace vague requests with specific, measurable expectations"),
    (Enhancement::BoostCreativity, "Encourage original, creative approaches rather than generic answers"),
    (Enhancement::StrengthenStructure, "Organize the prompt so the task, its context, and the expected deliverable are clearly separated"),
    (Enhancement::AddErrorHandling, "Ask for explicit handling of errors and failure cases"),
    (Enhancement::ImproveFlow, "Make each instruction follow naturally from the previous one"),
    (Enhancement::EnhanceReadability, "Use short sentences and plain wording to maximize readability"),
    (Enhancement::AddEdgeCases, "Call out edge cases and boundary conditions that must be handled"),
    (Enhancement::ImproveCoherence, "Keep terminology and intent consistent throughout the prompt"),
    (Enhancement::AddContextAwareness, "Make the prompt account for the user's situation, environment, and prior knowledge"),
    (Enhancement::EnableMarkdown, "Apply markdown formatting where it improves scanability"),
    (Enhancement::PreventLists, "Express all sequential or grouped information as connected prose"),
];

pub const ADVANCED_DIRECTIVES: &[(Enhancement, &str)] = &[
    (Enhancement::AddChainOfThought, "Instruct the model to reason through the problem in explicit stages before answering"),
    (Enhancement::IncludeSelfReflection, "Ask the model to critique its own answer before finalizing it"),
    (Enhancement::AddMultiPerspective, "Request that the problem be considered from multiple perspectives"),
    (Enhancement::IncludeVerificationSteps, "Include checks the model must perform to verify its answer"),
    (Enhancement::AddIterativeRefinement, "Ask for a draft followed by a refined final version"),
    (Enhancement::IncludeFallbackStrategies, "Specify what to do when the primary approach does not work"),
];

const CONTENT_FALLBACK: &str =
    "No additional content enhancements requested. Keep the scope of the original prompt.";
const QUALITY_FALLBACK: &str =
    "Preserve the existing quality characteristics while making the prompt more effective.";

const ROLE_LINE: &str = "You are an expert prompt engineer. Rewrite the original prompt below \
    into a stronger version that satisfies every requirement in this brief.";

const NO_LISTS_BLOCK: &str = "\
==================== CRITICAL FORMATTING RULE: NO LISTS ====================
The upgraded prompt MUST instruct the AI to answer in flowing paragraphs only.
FORBIDDEN: numbered lists (1. 2. 3.), bullet points (-, *, •), lettered items (a) b) c)), and enumerated steps such as \"Step 1\" or \"Step 2\".
REQUIRED: connect ideas with transitions such as \"first\", \"then\", \"after that\", and \"finally\" inside complete sentences.
WRONG: \"1. Install the package 2. Configure it 3. Run the tests\"
RIGHT: \"Start by installing the package, then configure it, and finally run the tests to confirm everything works.\"
The upgraded prompt itself must be written without lists, and it must explicitly tell the AI not to use numbered lists or bullet points in its response.
============================================================================";

const MARKDOWN_WITH_LISTS: &str = "Markdown is allowed. The upgraded prompt may use # headers, \
    **bold** and *italic* emphasis, and fenced code blocks, and may ask for markdown lists where they aid readability.";
const MARKDOWN_WITHOUT_LISTS: &str = "Markdown is allowed for # headers, **bold** and *italic* \
    emphasis, and fenced code blocks. Markdown list syntax (lines starting with -, *, + or 1.) \
    remains forbidden under the NO LISTS rule above.";
const PLAIN_TEXT_ONLY: &str = "Plain text only. Do not use markdown syntax such as # headers, \
    **bold**, *italics*, or ``` code fences.";

const FINAL_INSTRUCTIONS: &str = "Return only the upgraded prompt text, ready to paste into an AI assistant. \
    Preserve the original intent and every concrete detail from the original prompt. \
    Address each listed issue. Do not explain the changes or add commentary.";
const FINAL_NO_LISTS_REMINDER: &str = "Reminder: the upgraded prompt must forbid numbered lists \
    and bullet points in the AI's response.";

// ────────────────────────────────────────────────────────────────────────────
// Compiler
// ────────────────────────────────────────────────────────────────────────────

/// Renders the upgrade instruction. Same inputs always give the same string.
///
/// The caller guarantees `original_prompt` is non-empty after trimming.
pub fn compile_upgrade_prompt(
    original_prompt: &str,
    analysis: &PromptAnalysis,
    params: &UpgradeParameters,
) -> String {
    let prevent_lists = params.is_enabled(Enhancement::PreventLists);
    let mut out = String::with_capacity(4096);

    out.push_str(ROLE_LINE);
    out.push_str("\n\n");

    // Kept at the top so it survives any truncation of the tail.
    if prevent_lists {
        out.push_str(NO_LISTS_BLOCK);
        out.push_str("\n\n");
    }

    let formatting = match (params.is_enabled(Enhancement::EnableMarkdown), prevent_lists) {
        (true, false) => MARKDOWN_WITH_LISTS,
        (true, true) => MARKDOWN_WITHOUT_LISTS,
        (false, _) => PLAIN_TEXT_ONLY,
    };
    push_block(&mut out, "FORMATTING GUIDANCE", formatting);

    push_block(
        &mut out,
        "ORIGINAL PROMPT",
        &format!("\"\"\"\n{original_prompt}\n\"\"\""),
    );

    push_block(&mut out, "CURRENT ANALYSIS", &render_analysis(analysis));

    let issues = if analysis.weaknesses.is_empty() {
        "- No specific issues were diagnosed. Focus on overall effectiveness.".to_string()
    } else {
        dash_lines(analysis.weaknesses.iter().map(String::as_str))
    };
    push_block(&mut out, "ISSUES TO ADDRESS", &issues);

    let specs = params
        .choice_labels()
        .iter()
        .map(|(field, label)| format!("- {field}: {label}"))
        .collect::<Vec<_>>()
        .join("\n");
    push_block(&mut out, "SPECIFICATIONS", &specs);

    push_block(
        &mut out,
        "CONTENT ENHANCEMENTS",
        &render_directives(params, EnhancementGroup::Content)
            .unwrap_or_else(|| format!("- {CONTENT_FALLBACK}")),
    );
    push_block(
        &mut out,
        "QUALITY IMPROVEMENTS",
        &render_directives(params, EnhancementGroup::Quality)
            .unwrap_or_else(|| format!("- {QUALITY_FALLBACK}")),
    );
    if let Some(advanced) = render_directives(params, EnhancementGroup::Advanced) {
        push_block(&mut out, "ADVANCED TECHNIQUES", &advanced);
    }

    if !params.priority_focus.is_empty() {
        push_block(
            &mut out,
            "PRIORITY FOCUS (highest first)",
            &dash_lines(params.priority_focus.iter().map(String::as_str)),
        );
    }
    if !params.avoid_patterns.is_empty() {
        push_block(
            &mut out,
            "PATTERNS TO AVOID",
            &dash_lines(params.avoid_patterns.iter().map(String::as_str)),
        );
    }
    if !params.custom_instructions.trim().is_empty() {
        push_block(&mut out, "CUSTOM INSTRUCTIONS", &params.custom_instructions);
    }

    out.push_str("FINAL INSTRUCTIONS:\n");
    out.push_str(FINAL_INSTRUCTIONS);
    if prevent_lists {
        out.push('\n');
        out.push_str(FINAL_NO_LISTS_REMINDER);
    }

    debug!(
        "Compiled upgrade prompt: {} chars, {} flags enabled",
        out.len(),
        params.enhancements.iter().count()
    );
    out
}

fn push_block(out: &mut String, title: &str, body: &str) {
    out.push_str(&format!("{title}:\n{body}\n\n"));
}

fn dash_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines.map(|l| format!("- {l}")).collect::<Vec<_>>().join("\n")
}

/// One line per enabled flag of `group`, or `None` when none are enabled.
fn render_directives(params: &UpgradeParameters, group: EnhancementGroup) -> Option<String> {
    let lines: Vec<&str> = params.enabled_in(group).map(directive_for).collect();
    (!lines.is_empty()).then(|| dash_lines(lines.into_iter()))
}

fn render_analysis(analysis: &PromptAnalysis) -> String {
    let scores = analysis
        .scores()
        .iter()
        .map(|(name, score)| format!("{name} {score}/10"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Overall score: {}/10\nScores: {scores}\nEstimated performance: {}. Complexity: {}.",
        analysis.overall_score(),
        analysis.estimated_performance.as_str(),
        analysis.complexity.as_str()
    )
}

fn directive_table(group: EnhancementGroup) -> &'static [(Enhancement, &'static str)] {
    match group {
        EnhancementGroup::Content => CONTENT_DIRECTIVES,
        EnhancementGroup::Quality => QUALITY_DIRECTIVES,
        EnhancementGroup::Advanced => ADVANCED_DIRECTIVES,
    }
}

/// Directive sentence for a flag, looked up in its group's table.
pub fn directive_for(flag: Enhancement) -> &'static str {
    directive_table(flag.group())
        .iter()
        .find(|(f, _)| *f == flag)
        .map(|(_, sentence)| *sentence)
        .unwrap_or_default()
}

// ────────────────────────────────────────────────────────────────────────────
// Provider output cleanup
// ────────────────────────────────────────────────────────────────────────────

const OUTPUT_LABELS: &[&str] = &[
    "upgraded prompt:",
    "improved prompt:",
    "enhanced prompt:",
    "rewritten prompt:",
];

/// Strips the wrapping the provider sometimes adds around the upgraded prompt:
/// a leading "Upgraded prompt:" label, code fences, and enclosing quotes.
pub fn clean_upgraded_output(raw: &str) -> String {
    let text = strip_output_label(raw.trim());
    let text = strip_code_fences(text);
    let text = match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) if !inner.contains('"') => inner,
        _ => text,
    };
    text.trim().to_string()
}

fn strip_output_label(text: &str) -> &str {
    let unstarred = text.trim_start_matches('*').trim_start();
    for label in OUTPUT_LABELS {
        let matches = unstarred
            .get(..label.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(label));
        if matches {
            return unstarred[label.len()..].trim_start_matches('*').trim_start();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upgrade::analysis::fallback_analysis;
    use crate::upgrade::parameters::Purpose;

    fn no_flags() -> UpgradeParameters {
        UpgradeParameters::default().with_flags(&[])
    }

    fn all_directives() -> impl Iterator<Item = &'static (Enhancement, &'static str)> {
        CONTENT_DIRECTIVES
            .iter()
            .chain(QUALITY_DIRECTIVES)
            .chain(ADVANCED_DIRECTIVES)
    }

    #[test]
    fn test_every_flag_has_exactly_one_directive() {
        for flag in Enhancement::ALL {
            let rows = all_directives().filter(|(f, _)| f == flag).count();
            assert_eq!(rows, 1, "{flag} must appear in exactly one table");
            assert!(!directive_for(*flag).is_empty());
        }
    }

    #[test]
    fn test_tables_match_flag_groups() {
        assert!(CONTENT_DIRECTIVES.iter().all(|(f, _)| f.group() == EnhancementGroup::Content));
        assert!(QUALITY_DIRECTIVES.iter().all(|(f, _)| f.group() == EnhancementGroup::Quality));
        assert!(ADVANCED_DIRECTIVES.iter().all(|(f, _)| f.group() == EnhancementGroup::Advanced));
    }

    #[test]
    fn test_tables_list_flags_in_render_order() {
        for group in EnhancementGroup::ALL {
            let table: Vec<Enhancement> = directive_table(group).iter().map(|(f, _)| *f).collect();
            let everything = no_flags().with_flags(Enhancement::ALL);
            let rendered: Vec<Enhancement> = everything.enabled_in(group).collect();
            assert_eq!(table, rendered);
        }
    }

    #[test]
    fn test_directives_render_in_group_order_not_insertion_order() {
        let mut params = no_flags();
        params.set_flag(Enhancement::IncludeValidation, true);
        params.set_flag(Enhancement::IncludeExamples, true);
        let out = compile_upgrade_prompt("p", &fallback_analysis(), &params);
        let examples = out.find(directive_for(Enhancement::IncludeExamples)).unwrap();
        let validation = out.find(directive_for(Enhancement::IncludeValidation)).unwrap();
        assert!(examples < validation);
    }

    #[test]
    fn test_all_flags_off_renders_mandatory_blocks_only() {
        let params = no_flags();
        let out = compile_upgrade_prompt("Summarize this article", &fallback_analysis(), &params);

        assert!(out.contains("Summarize this article"));
        assert!(out.contains("SPECIFICATIONS:"));
        assert!(out.contains("- Purpose: general"));
        assert!(out.contains("- Detail level: detailed"));
        assert!(out.contains("FINAL INSTRUCTIONS:"));
        assert!(out.contains(CONTENT_FALLBACK));
        assert!(out.contains(QUALITY_FALLBACK));
        assert!(!out.contains("ADVANCED TECHNIQUES"));
        assert!(!out.contains("PRIORITY FOCUS"));
        assert!(!out.contains("PATTERNS TO AVOID"));
        assert!(!out.contains("CUSTOM INSTRUCTIONS"));
        for (flag, sentence) in all_directives() {
            assert!(!out.contains(sentence), "{flag} directive leaked");
        }
    }

    #[test]
    fn test_each_flag_toggles_only_its_directive() {
        let analysis = fallback_analysis();
        for flag in Enhancement::ALL {
            let params = no_flags().with_flags(&[*flag]);
            let out = compile_upgrade_prompt("Plan a trip", &analysis, &params);
            for (other, sentence) in all_directives() {
                assert_eq!(
                    out.contains(sentence),
                    other == flag,
                    "with only {flag} enabled, directive for {other} presence was wrong"
                );
            }
        }
    }

    #[test]
    fn test_all_flags_on_render_every_directive() {
        let params = no_flags().with_flags(Enhancement::ALL);
        let out = compile_upgrade_prompt("Plan a trip", &fallback_analysis(), &params);
        for (_, sentence) in all_directives() {
            assert!(out.contains(sentence));
        }
        assert!(!out.contains(CONTENT_FALLBACK));
        assert!(!out.contains(QUALITY_FALLBACK));
    }

    #[test]
    fn test_prevent_lists_block_present_and_near_top() {
        let params = no_flags().with_flags(&[Enhancement::PreventLists]);
        let out = compile_upgrade_prompt("Explain TCP", &fallback_analysis(), &params);

        let block = out.find("NO LISTS").expect("list prevention block missing");
        let original = out.find("ORIGINAL PROMPT").unwrap();
        assert!(block < original, "list prevention must precede the original prompt");
        assert!(out.contains("numbered lists"));
        assert!(out.contains("bullet points"));
        assert!(out.contains("WRONG:"));
        assert!(out.contains("RIGHT:"));
    }

    #[test]
    fn test_prevent_lists_off_has_no_list_directive() {
        for flags in [vec![], vec![Enhancement::EnableMarkdown]] {
            let params = no_flags().with_flags(&flags);
            let out = compile_upgrade_prompt("Explain TCP", &fallback_analysis(), &params);
            assert!(!out.contains("NO LISTS"));
            assert!(!out.contains("numbered lists"));
            assert!(!out.contains("bullet points"));
        }
    }

    #[test]
    fn test_markdown_enabled_permits_syntax() {
        let params = no_flags().with_flags(&[Enhancement::EnableMarkdown]);
        let out = compile_upgrade_prompt("Explain TCP", &fallback_analysis(), &params);
        assert!(out.contains(MARKDOWN_WITH_LISTS));
        assert!(!out.contains(PLAIN_TEXT_ONLY));
    }

    #[test]
    fn test_markdown_disabled_forbids_syntax() {
        let out = compile_upgrade_prompt("Explain TCP", &fallback_analysis(), &no_flags());
        assert!(out.contains(PLAIN_TEXT_ONLY));
        assert!(!out.contains("Markdown is allowed"));
    }

    #[test]
    fn test_markdown_and_prevent_lists_do_not_contradict() {
        let params =
            no_flags().with_flags(&[Enhancement::EnableMarkdown, Enhancement::PreventLists]);
        let out = compile_upgrade_prompt("Explain TCP", &fallback_analysis(), &params);

        assert!(out.contains("Markdown is allowed for # headers, **bold**"));
        assert!(out.contains("Markdown list syntax"));
        assert!(out.contains("remains forbidden"));
        assert!(!out.contains("may ask for markdown lists"));
        assert!(!out.contains(PLAIN_TEXT_ONLY));
    }

    #[test]
    fn test_weaknesses_echoed_verbatim() {
        let mut analysis = fallback_analysis();
        analysis.weaknesses = vec!["No target language given".into(), "Missing *constraints*".into()];
        let out = compile_upgrade_prompt("Sort a list", &analysis, &no_flags());
        let issues = out.find("ISSUES TO ADDRESS:").unwrap();
        assert!(out[issues..].contains("- No target language given\n- Missing *constraints*"));
    }

    #[test]
    fn test_free_form_blocks_preserve_order() {
        let mut params = no_flags();
        params.priority_focus = vec!["correctness".into(), "speed".into(), "brevity".into()];
        params.avoid_patterns = vec!["jargon".into(), "passive voice".into()];
        params.custom_instructions = "Target Python 3.12.\nNo external packages.".into();

        let out = compile_upgrade_prompt("Write a parser", &fallback_analysis(), &params);
        assert!(out.contains("PRIORITY FOCUS (highest first):\n- correctness\n- speed\n- brevity"));
        assert!(out.contains("PATTERNS TO AVOID:\n- jargon\n- passive voice"));
        assert!(out.contains("CUSTOM INSTRUCTIONS:\nTarget Python 3.12.\nNo external packages."));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let params = UpgradeParameters::default();
        let analysis = fallback_analysis();
        let a = compile_upgrade_prompt("Draft an email", &analysis, &params);
        let b = compile_upgrade_prompt("Draft an email", &analysis, &params);
        assert_eq!(a, b);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut analysis = fallback_analysis();
        analysis.weaknesses = vec!["too vague".to_string()];
        let mut params = no_flags().with_flags(&[Enhancement::IncludeExamples]);
        params.purpose = Purpose::CodeGeneration;

        let out = compile_upgrade_prompt("write a function", &analysis, &params);
        assert!(out.contains("write a function"));
        assert!(out.contains("too vague"));
        assert!(out.contains(directive_for(Enhancement::IncludeExamples)));
        assert!(out.contains("code generation"));
    }

    #[test]
    fn test_clean_strips_label_and_fences() {
        let raw = "**Upgraded Prompt:**\n```\nYou are a senior Rust reviewer.\n```";
        assert_eq!(clean_upgraded_output(raw), "You are a senior Rust reviewer.");
    }

    #[test]
    fn test_clean_strips_wrapping_quotes() {
        assert_eq!(clean_upgraded_output("  \"Act as a tutor.\"  "), "Act as a tutor.");
        // inner quotes mean the quotes are content, not wrapping
        assert_eq!(
            clean_upgraded_output("\"Hi\" said the \"bot\""),
            "\"Hi\" said the \"bot\""
        );
    }

    #[test]
    fn test_clean_leaves_plain_text() {
        let text = "*Role*: You are a data analyst.";
        assert_eq!(clean_upgraded_output(text), text);
    }
}

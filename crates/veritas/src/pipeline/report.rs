//! Markdown section handling for stage output.

use std::sync::LazyLock;

use regex::Regex;

pub const WALLET_PROFILE_HEADING: &str = "### Wallet Profile";
pub const SECURITY_HEADING: &str = "### Security Observations";
pub const DUEL_HEADING: &str = "### Wallet Duel Analysis";

// A Markdown heading at any level, or a line that is bold text and nothing else.
static RE_HEADING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:#{1,6}[ \t]*(?P<atx>.+?)|(?:\*\*|__)(?P<bold>[^*_]+?)(?:\*\*|__)[ \t]*:?)[ \t]*$")
        .unwrap()
});

/// Title of a heading-like line, without markup or a trailing colon.
fn heading_title(line: &str) -> Option<&str> {
    let caps = RE_HEADING_LINE.captures(line.trim_end_matches(['\r', '\n']))?;
    let raw = caps.name("atx").or_else(|| caps.name("bold"))?.as_str();
    let title = raw.trim_matches(|c: char| c == '*' || c == '_' || c == ':' || c.is_whitespace());
    (!title.is_empty()).then_some(title)
}

fn title_of(heading: &str) -> &str {
    heading.trim_start_matches('#').trim()
}

/// Lines of `text` with their byte offsets.
fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    text.split_inclusive('\n').scan(0, |offset, line| {
        let start = *offset;
        *offset += line.len();
        Some((start, line))
    })
}

/// Byte range of the first line whose heading title matches `heading`.
fn find_heading(text: &str, heading: &str) -> Option<(usize, usize)> {
    let wanted = title_of(heading);
    lines_with_offsets(text)
        .find(|(_, line)| heading_title(line).is_some_and(|t| t.eq_ignore_ascii_case(wanted)))
        .map(|(start, line)| (start, start + line.len()))
}

/// Returns `text` as a section under `heading`.
///
/// The heading is recognized at any level or in bold and rewritten to the
/// canonical form. Anything before it is dropped. If it is absent it is
/// prepended.
pub fn ensure_section(text: &str, heading: &str) -> String {
    let text = text.trim();
    match find_heading(text, heading) {
        Some((_, end)) => {
            let body = text[end..].trim_end();
            if body.trim().is_empty() {
                heading.to_string()
            } else {
                format!("{}\n{}", heading, body)
            }
        }
        None if text.is_empty() => heading.to_string(),
        None => format!("{}\n{}", heading, text),
    }
}

/// Removes the section under `heading`, up to the next heading-like line.
pub fn strip_section(text: &str, heading: &str) -> String {
    let Some((start, body_start)) = find_heading(text, heading) else {
        return text.trim().to_string();
    };
    let end = lines_with_offsets(&text[body_start..])
        .find(|(_, line)| heading_title(line).is_some())
        .map(|(offset, _)| body_start + offset)
        .unwrap_or(text.len());

    format!("{}\n{}", text[..start].trim_end(), &text[end..])
        .trim()
        .to_string()
}

/// Places `section` after the dependency's output, which is kept verbatim.
pub fn append_section(dependency_output: &str, section: &str) -> String {
    format!("{}\n\n{}", dependency_output.trim_end(), section)
}

/// Builds a stage's output that follows its dependency's section.
///
/// A model asked for its own section often repeats the dependency's section
/// first; that copy is discarded so the dependency appears exactly once.
pub fn compose_after(dependency_output: &str, reply: &str, heading: &str) -> String {
    let reply = match dependency_output.lines().next().and_then(heading_title) {
        Some(dependency_title) => strip_section(reply, dependency_title),
        None => reply.trim().to_string(),
    };
    append_section(dependency_output, &ensure_section(&reply, heading))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = "### Wallet Profile\n- **Primary Activity:** collecting";

    #[test]
    fn test_section_kept_when_heading_present() {
        assert_eq!(ensure_section(PROFILE, WALLET_PROFILE_HEADING), PROFILE);
    }

    #[test]
    fn test_preamble_before_heading_dropped() {
        let text = "Sure! Here you go.\n\n### Wallet Duel Analysis\n- a";
        assert_eq!(
            ensure_section(text, DUEL_HEADING),
            "### Wallet Duel Analysis\n- a"
        );
    }

    #[test]
    fn test_missing_heading_prepended() {
        assert_eq!(
            ensure_section("- **Token Dust:** low\n", SECURITY_HEADING),
            "### Security Observations\n- **Token Dust:** low"
        );
        assert_eq!(ensure_section("  ", SECURITY_HEADING), SECURITY_HEADING);
    }

    #[test]
    fn test_other_heading_levels_normalized() {
        assert_eq!(
            ensure_section("## Wallet Duel Analysis\n- a", DUEL_HEADING),
            "### Wallet Duel Analysis\n- a"
        );
        assert_eq!(
            ensure_section("Intro\n#### security observations:\n- b", SECURITY_HEADING),
            "### Security Observations\n- b"
        );
    }

    #[test]
    fn test_bold_headings_normalized() {
        assert_eq!(
            ensure_section("**Wallet Duel Analysis**\n\n- a", DUEL_HEADING),
            "### Wallet Duel Analysis\n\n- a"
        );
        assert_eq!(
            ensure_section("### **Security Observations:**\n- b", SECURITY_HEADING),
            "### Security Observations\n- b"
        );
    }

    #[test]
    fn test_bold_bullets_are_not_headings() {
        let text = "- **Token Dust:** low";
        assert_eq!(
            ensure_section(text, SECURITY_HEADING),
            "### Security Observations\n- **Token Dust:** low"
        );
    }

    #[test]
    fn test_append_section_orders_dependency_first() {
        let combined = append_section(
            "### Wallet Profile\n- a\n",
            "### Security Observations\n- b",
        );
        assert_eq!(
            combined,
            "### Wallet Profile\n- a\n\n### Security Observations\n- b"
        );
    }

    #[test]
    fn test_repeated_profile_with_other_heading_level_appears_once() {
        let reply = "## Wallet Profile\n- **Primary Activity:** collecting\n\n\
                     ## Security Observations\n- **Token Dust:** low";
        let report = compose_after(PROFILE, reply, SECURITY_HEADING);

        assert_eq!(report.matches("Wallet Profile").count(), 1);
        assert_eq!(report.matches("Security Observations").count(), 1);
        assert_eq!(
            report,
            "### Wallet Profile\n- **Primary Activity:** collecting\n\n\
             ### Security Observations\n- **Token Dust:** low"
        );
    }

    #[test]
    fn test_repeated_profile_without_own_heading_is_dropped() {
        let reply = "**Wallet Profile**\n- **Primary Activity:** collecting\n\n\
                     **Security Observations**\n- **Transaction Velocity:** low";
        let report = compose_after(PROFILE, reply, SECURITY_HEADING);
        assert_eq!(report.matches("Wallet Profile").count(), 1);
        assert!(report.ends_with("### Security Observations\n- **Transaction Velocity:** low"));

        let reply = "### Wallet Profile\n- copy\n\n- **Token Dust:** none";
        let report = compose_after(PROFILE, reply, SECURITY_HEADING);
        assert_eq!(report.matches("Wallet Profile").count(), 1);
        assert!(!report.contains("- copy"));
    }

    #[test]
    fn test_security_section_before_repeated_profile() {
        let reply = "## Security Observations\n- b\n\n## Wallet Profile\n- copy";
        let report = compose_after(PROFILE, reply, SECURITY_HEADING);
        assert_eq!(report, format!("{}\n\n### Security Observations\n- b", PROFILE));
    }

    #[test]
    fn test_strip_section_stops_at_next_heading() {
        let text = "intro\n## Wallet Profile\n- a\n**Next**\n- b";
        assert_eq!(
            strip_section(text, WALLET_PROFILE_HEADING),
            "intro\n**Next**\n- b"
        );
        assert_eq!(strip_section("- b\n", WALLET_PROFILE_HEADING), "- b");
    }
}

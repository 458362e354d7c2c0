//! Splits a generated outline into its top-level sections.
//!
//! A section starts at a line beginning with exactly `##` followed by
//! whitespace, a line break included. The heading is the first non-blank line
//! after the marker. Deeper headers (`###`) stay inside their parent section,
//! and anything before the first `##` header is not a section.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use contentforge_shared::OutlineSection;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##(?:[ \t]+|[ \t]*\r?\n)").expect("valid regex"));

/// Split `outline` into sections, in document order.
///
/// Fragments with neither heading nor body text are dropped. An outline
/// without `##` headers yields no sections.
pub fn split_outline(outline: &str) -> Vec<OutlineSection> {
    let markers: Vec<_> = SECTION_RE.find_iter(outline).collect();

    if let Some(first) = markers.first() {
        let preamble = outline[..first.start()].trim();
        if !preamble.is_empty() {
            debug!(chars = preamble.len(), "dropping outline preamble");
        }
    }

    let mut sections = Vec::with_capacity(markers.len());
    for (i, marker) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(outline.len(), |next| next.start());
        let fragment = outline[marker.end()..end].trim_start();

        let (heading, body) = fragment.split_once('\n').unwrap_or((fragment, ""));
        let (heading, body) = (heading.trim(), body.trim());

        if heading.is_empty() && body.is_empty() {
            continue;
        }

        sections.push(OutlineSection {
            heading: heading.to_string(),
            body: body.to_string(),
        });
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_two_sections() {
        let sections = split_outline("## Intro\nfoo\n## Specs\nbar");
        assert_eq!(
            sections,
            vec![
                OutlineSection {
                    heading: "Intro".into(),
                    body: "foo".into()
                },
                OutlineSection {
                    heading: "Specs".into(),
                    body: "bar".into()
                },
            ]
        );
    }

    #[test]
    fn subsections_stay_with_parent() {
        let outline = "## Overview\n### History\n- early models\n### Today\n## Buying\n- price";
        let sections = split_outline(outline);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "Overview");
        assert!(sections[0].body.contains("### History"));
        assert!(sections[0].body.contains("### Today"));
        assert_eq!(sections[1].body, "- price");
    }

    #[test]
    fn preamble_is_not_a_section() {
        let outline = "# Electric Bikes\n\nAn article outline.\n\n## Intro\nfoo";
        let sections = split_outline(outline);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Intro");
    }

    #[test]
    fn no_headers_no_sections() {
        assert!(split_outline("").is_empty());
        assert!(split_outline("just some prose\n# only an h1\n### and an h3").is_empty());
    }

    #[test]
    fn header_marker_must_start_line() {
        let sections = split_outline("## A\ntext with ## inside\n  ## indented\n##NoSpace");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].body.contains("##NoSpace"));
    }

    #[test]
    fn n_headers_n_sections_in_order() {
        let outline: String = (1..=7).map(|i| format!("## Part {i}\nbody {i}\n")).collect();
        let sections = split_outline(&outline);
        assert_eq!(sections.len(), 7);
        for (i, section) in sections.iter().enumerate() {
            assert_eq!(section.heading, format!("Part {}", i + 1));
            assert_eq!(section.body, format!("body {}", i + 1));
        }
    }

    #[test]
    fn marker_followed_by_line_break() {
        let sections = split_outline("##\nIntroduction\n- point a\n##\r\nSpecs\n- point b");
        assert_eq!(
            sections,
            vec![
                OutlineSection {
                    heading: "Introduction".into(),
                    body: "- point a".into()
                },
                OutlineSection {
                    heading: "Specs".into(),
                    body: "- point b".into()
                },
            ]
        );
    }

    #[test]
    fn heading_without_body() {
        let sections = split_outline("## Wrap-up");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Wrap-up");
        assert_eq!(sections[0].body, "");
    }

    #[test]
    fn empty_fragments_dropped() {
        let sections = split_outline("## \n## Real\ncontent\r\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Real");
        assert_eq!(sections[0].body, "content");
    }
}

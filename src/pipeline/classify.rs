//! Page classification: TEXT or MIXED by text-coverage ratio.
//!
//! Pure computation, no failure mode of its own. A page whose extractable
//! text covers at least the configured threshold of its area goes down the
//! cheap direct-extraction path; everything else — image-heavy pages,
//! scanned pages, pages with no text at all — goes to the vision model.

use crate::output::{PageKind, PageSurvey};

/// Classify a surveyed page against the configured threshold.
///
/// Rules, in order:
/// * no extractable text at all → MIXED (safe default: send to vision
///   rather than emit an empty fragment, even when the threshold is 0);
/// * `ratio >= threshold` → TEXT (the boundary is inclusive);
/// * otherwise → MIXED.
pub fn classify(survey: &PageSurvey, threshold: f32) -> PageKind {
    if survey.text.trim().is_empty() {
        return PageKind::Mixed;
    }
    if survey.text_coverage_ratio() >= threshold {
        PageKind::Text
    } else {
        PageKind::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(text_area: f32, total_area: f32, text: &str) -> PageSurvey {
        PageSurvey {
            index: 0,
            total_area,
            text_area,
            text: text.to_string(),
        }
    }

    #[test]
    fn dense_text_page_is_text() {
        let s = survey(950.0, 1000.0, "lots of body text");
        assert_eq!(classify(&s, 0.9), PageKind::Text);
    }

    #[test]
    fn image_heavy_page_is_mixed() {
        let s = survey(500.0, 1000.0, "a caption");
        assert_eq!(classify(&s, 0.9), PageKind::Mixed);
    }

    #[test]
    fn ratio_exactly_at_threshold_is_text() {
        let s = survey(900.0, 1000.0, "text");
        assert_eq!(classify(&s, 0.9), PageKind::Text);
    }

    #[test]
    fn ratio_just_below_threshold_is_mixed() {
        let s = survey(899.0, 1000.0, "text");
        assert_eq!(classify(&s, 0.9), PageKind::Mixed);
    }

    #[test]
    fn full_page_image_is_mixed() {
        let s = survey(0.0, 1000.0, "");
        assert_eq!(classify(&s, 0.9), PageKind::Mixed);
    }

    #[test]
    fn no_text_and_no_images_is_mixed() {
        // Blank or unreadable page: zero glyphs, zero detected content.
        let s = survey(0.0, 1000.0, "");
        assert_eq!(classify(&s, 0.9), PageKind::Mixed);
    }

    #[test]
    fn empty_text_is_mixed_even_at_zero_threshold() {
        let s = survey(0.0, 1000.0, "   ");
        assert_eq!(classify(&s, 0.0), PageKind::Mixed);
    }

    #[test]
    fn degenerate_zero_area_page_is_mixed() {
        let s = survey(0.0, 0.0, "text");
        assert_eq!(classify(&s, 0.9), PageKind::Mixed);
    }
}

//! Derived metrics over the course list: overall progress and the
//! category-based study suggestion.

use crate::model::Course;

/// Fixed prompt surfaced when the study mix is backend-only.
pub const EXPLORE_UIUX_PROMPT: &str = "Que tal explorar UI/UX?";

/// Mean completion ratio across all courses that have lessons.
///
/// Courses with a zero lesson total are excluded from the average rather than
/// counted as zero. Returns `0.0` when no course qualifies. The result is
/// clamped to `[0, 1]` to absorb floating-point drift.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overall_progress(courses: &[Course]) -> f32 {
    let ratios: Vec<f32> = courses.iter().filter_map(Course::progress).collect();
    if ratios.is_empty() {
        return 0.0;
    }
    let mean = ratios.iter().sum::<f32>() / ratios.len() as f32;
    mean.clamp(0.0, 1.0)
}

/// Category tallies feeding the suggestion rules.
///
/// Matching is a case-insensitive substring check, so a single course may
/// land in several buckets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CategoryCounts {
    backend: usize,
    frontend: usize,
    uiux: usize,
}

impl CategoryCounts {
    fn tally(courses: &[Course]) -> Self {
        let mut counts = Self::default();
        for course in courses {
            let category = course.category().to_lowercase();
            if category.contains("backend") {
                counts.backend += 1;
            }
            if category.contains("frontend") {
                counts.frontend += 1;
            }
            if category.contains("ui") || category.contains("ux") {
                counts.uiux += 1;
            }
        }
        counts
    }
}

struct SuggestionRule {
    applies: fn(CategoryCounts) -> bool,
    message: &'static str,
}

/// Evaluated in priority order; the first matching rule wins.
const SUGGESTION_RULES: &[SuggestionRule] = &[SuggestionRule {
    applies: |counts| counts.backend >= 2 && counts.frontend == 0 && counts.uiux == 0,
    message: EXPLORE_UIUX_PROMPT,
}];

/// Picks the study suggestion for the current course list, if any rule fires.
#[must_use]
pub fn suggestion(courses: &[Course]) -> Option<&'static str> {
    let counts = CategoryCounts::tally(courses);
    SUGGESTION_RULES
        .iter()
        .find(|rule| (rule.applies)(counts))
        .map(|rule| rule.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(category: &str, completed: i32, total: i32) -> Course {
        Course::new("Course", category, total).with_progress(completed, "")
    }

    #[test]
    fn overall_progress_of_empty_list_is_zero() {
        assert_eq!(overall_progress(&[]), 0.0);
    }

    #[test]
    fn overall_progress_excludes_zero_total_courses() {
        let courses = vec![
            course("Backend", 5, 10),
            course("Backend", 0, 0),
            course("Backend", 0, 0),
        ];
        assert!((overall_progress(&courses) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn overall_progress_of_all_zero_totals_is_zero() {
        let courses = vec![course("Backend", 0, 0), course("Frontend", 0, 0)];
        assert_eq!(overall_progress(&courses), 0.0);
    }

    #[test]
    fn overall_progress_averages_ratios() {
        let courses = vec![course("Backend", 5, 10), course("Backend", 0, 10)];
        assert!((overall_progress(&courses) - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn overall_progress_stays_within_unit_interval() {
        let courses = vec![course("Backend", 10, 10), course("Backend", 10, 10)];
        let progress = overall_progress(&courses);
        assert!((0.0..=1.0).contains(&progress));
        assert!((progress - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn two_backend_courses_trigger_the_uiux_prompt() {
        let courses = vec![course("Backend", 1, 10), course("backend apis", 2, 10)];
        assert_eq!(suggestion(&courses), Some(EXPLORE_UIUX_PROMPT));
    }

    #[test]
    fn a_frontend_course_silences_the_prompt() {
        let courses = vec![
            course("Backend", 1, 10),
            course("Backend", 2, 10),
            course("Frontend", 0, 5),
        ];
        assert_eq!(suggestion(&courses), None);
    }

    #[test]
    fn a_uiux_course_silences_the_prompt() {
        let courses = vec![
            course("Backend", 1, 10),
            course("Backend", 2, 10),
            course("UI/UX", 0, 5),
        ];
        assert_eq!(suggestion(&courses), None);
    }

    #[test]
    fn one_backend_course_is_not_enough() {
        let courses = vec![course("Backend", 1, 10)];
        assert_eq!(suggestion(&courses), None);
    }

    #[test]
    fn category_matching_ignores_case() {
        let courses = vec![course("BACKEND", 1, 10), course("BaCkEnD", 2, 10)];
        assert_eq!(suggestion(&courses), Some(EXPLORE_UIUX_PROMPT));
    }
}

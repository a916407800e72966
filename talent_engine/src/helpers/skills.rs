use std::collections::HashSet;

/// Bonus added when a candidate has every required skill.
const FULL_MATCH_BONUS: f64 = 5.0;

fn normalize(skill: &str) -> String {
    skill.trim().to_lowercase()
}

/// A rule-based skill overlap score in `[0, 100]`, rounded to one decimal place.
///
/// The score is the percentage of required skills that the candidate lists, compared case-insensitively and ignoring
/// surrounding whitespace. A candidate holding every required skill gets a small bonus, capped at 100. Blank entries
/// are ignored. A job with no required skills scores 0 for everyone.
///
/// This is reported next to a ranking for information. It does not affect the order.
pub fn skill_overlap_score(required: &[String], candidate: &[String]) -> f64 {
    let held = candidate.iter().map(|s| normalize(s)).filter(|s| !s.is_empty()).collect::<HashSet<_>>();
    let required = required.iter().map(|s| normalize(s)).filter(|s| !s.is_empty()).collect::<Vec<_>>();
    if required.is_empty() {
        return 0.0;
    }
    let matched = required.iter().filter(|s| held.contains(*s)).count();
    let mut score = matched as f64 / required.len() as f64 * 100.0;
    if matched == required.len() {
        score += FULL_MATCH_BONUS;
    }
    (score.min(100.0) * 10.0).round() / 10.0
}

/// The display form of a skill name: each whitespace-separated word with its first letter in upper case and the rest
/// in lower case, joined by single spaces. `"  spring   BOOT "` becomes `"Spring Boot"`. Blank names give an empty
/// string.
pub fn display_skill_name(skill: &str) -> String {
    skill
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clamps a raw score into `[0, 100]`. Returns `None` for NaN.
pub fn clamp_score(score: f64) -> Option<f64> {
    if score.is_nan() {
        None
    } else {
        Some(score.clamp(0.0, 100.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn skills(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overlap() {
        let required = skills(&["Rust", "SQL", " Docker "]);
        assert_eq!(skill_overlap_score(&required, &skills(&["rust", "docker"])), 66.7);
        assert_eq!(skill_overlap_score(&required, &skills(&["RUST", "sql", "docker", "go"])), 100.0);
        assert_eq!(skill_overlap_score(&required, &[]), 0.0);
        assert_eq!(skill_overlap_score(&[], &skills(&["rust"])), 0.0);
    }

    #[test]
    fn full_match_bonus_is_capped() {
        let required = skills(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]);
        let mut held = required.clone();
        assert_eq!(skill_overlap_score(&required, &held), 100.0);
        held.pop();
        // 10 of 11 is 90.9, and no bonus
        assert_eq!(skill_overlap_score(&required, &held), 90.9);
    }

    #[test]
    fn skill_names_are_title_cased() {
        assert_eq!(display_skill_name("  spring   BOOT "), "Spring Boot");
        assert_eq!(display_skill_name("rust"), "Rust");
        assert_eq!(display_skill_name("C++"), "C++");
        assert_eq!(display_skill_name("éLIXIR"), "Élixir");
        assert_eq!(display_skill_name(" \t "), "");
    }

    #[test]
    fn blank_required_skills_are_ignored() {
        assert_eq!(skill_overlap_score(&skills(&["rust", "  "]), &skills(&["rust"])), 100.0);
        assert_eq!(skill_overlap_score(&skills(&["", " "]), &skills(&["rust"])), 0.0);
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp_score(-3.0), Some(0.0));
        assert_eq!(clamp_score(140.0), Some(100.0));
        assert_eq!(clamp_score(45.5), Some(45.5));
        assert_eq!(clamp_score(f64::INFINITY), Some(100.0));
        assert_eq!(clamp_score(f64::NAN), None);
    }
}
